use thiserror::Error;

use crate::document::Revision;

/// Errors from configuration providers and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("revision {0} not found")]
    RevisionNotFound(Revision),

    #[error("no configuration revision available")]
    NoRevisions,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

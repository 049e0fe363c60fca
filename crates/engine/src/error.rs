use thiserror::Error;
use tripwire_config::ConfigError;
use tripwire_rules::{ConstructionError, ExecutorError, LookupError};

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration provider failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A configuration document could not be turned into a rule graph.
    #[error("invalid configuration: {0}")]
    Construction(#[from] ConstructionError),

    /// A rule or rule set failed validation or execution.
    #[error("execution failed: {0}")]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// No node with this id is registered.
    #[error("unknown node `{0}`")]
    UnknownNode(String),

    /// The engine was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}

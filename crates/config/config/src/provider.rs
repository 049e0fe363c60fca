use async_trait::async_trait;

use crate::document::{ConfigDocument, Revision};
use crate::error::ConfigError;

/// Storage for versioned configuration documents.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// The highest stored revision, or `None` when nothing is stored.
    async fn latest_revision(&self) -> Result<Option<Revision>, ConfigError>;

    /// Load one revision. Fails with [`ConfigError::RevisionNotFound`] if it
    /// is not stored.
    async fn load(&self, revision: Revision) -> Result<ConfigDocument, ConfigError>;

    /// Store a document under its own revision, replacing any document
    /// already stored there.
    async fn save(&self, document: &ConfigDocument) -> Result<(), ConfigError>;

    /// Load the highest stored revision.
    async fn load_latest(&self) -> Result<ConfigDocument, ConfigError> {
        let revision = self
            .latest_revision()
            .await?
            .ok_or(ConfigError::NoRevisions)?;
        self.load(revision).await
    }
}

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tripwire_config::{ConfigDocument, ConfigError, ConfigProvider, Revision};

/// In-memory [`ConfigProvider`] keyed by revision.
///
/// Useful for tests and for embedding a fixed configuration.
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    documents: RwLock<BTreeMap<Revision, ConfigDocument>>,
}

impl MemoryConfigProvider {
    /// Create a new, empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider pre-populated with documents.
    pub fn with_documents(documents: impl IntoIterator<Item = ConfigDocument>) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().map(|d| (d.revision, d)).collect()),
        }
    }

    /// Number of stored revisions.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn latest_revision(&self) -> Result<Option<Revision>, ConfigError> {
        Ok(self.documents.read().await.keys().next_back().copied())
    }

    async fn load(&self, revision: Revision) -> Result<ConfigDocument, ConfigError> {
        self.documents
            .read()
            .await
            .get(&revision)
            .cloned()
            .ok_or(ConfigError::RevisionNotFound(revision))
    }

    async fn save(&self, document: &ConfigDocument) -> Result<(), ConfigError> {
        self.documents
            .write()
            .await
            .insert(document.revision, document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tripwire_config::testing::run_provider_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let provider = MemoryConfigProvider::new();
        run_provider_conformance_tests(&provider)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn with_documents_prepopulates() {
        let provider = MemoryConfigProvider::with_documents([
            ConfigDocument::empty(Revision::new(1)),
            ConfigDocument::empty(Revision::new(4)),
        ]);
        assert_eq!(provider.len().await, 2);
        assert_eq!(
            provider.latest_revision().await.unwrap(),
            Some(Revision::new(4))
        );
    }
}

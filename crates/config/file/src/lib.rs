use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use tripwire_config::{ConfigDocument, ConfigError, ConfigFormat, ConfigProvider, Revision};

/// [`ConfigProvider`] storing one file per revision in a directory.
///
/// Files are named `<revision>.json`, `<revision>.yaml` or
/// `<revision>.yml`; other files are ignored. When several files share a
/// revision, JSON wins over YAML. Saving always writes JSON and removes any
/// YAML file of the same revision.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    dir: PathBuf,
}

impl FileConfigProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn backend_error(path: &Path, e: &io::Error) -> ConfigError {
        ConfigError::Backend(format!("{}: {e}", path.display()))
    }

    /// Map every stored revision to the file holding it.
    async fn revisions(&self) -> Result<BTreeMap<Revision, (PathBuf, ConfigFormat)>, ConfigError> {
        let mut found = BTreeMap::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(Self::backend_error(&self.dir, &e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::backend_error(&self.dir, &e))?
        {
            let path = entry.path();
            let Some(format) = ConfigFormat::from_path(&path) else {
                continue;
            };
            let Some(revision) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Revision>().ok())
            else {
                continue;
            };
            match found.get(&revision) {
                Some((existing, ConfigFormat::Json)) => {
                    warn!(path = %path.display(), kept = %existing.display(), "ignoring duplicate revision file");
                }
                Some((existing, _)) if format != ConfigFormat::Json => {
                    warn!(path = %path.display(), kept = %existing.display(), "ignoring duplicate revision file");
                }
                _ => {
                    found.insert(revision, (path, format));
                }
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn latest_revision(&self) -> Result<Option<Revision>, ConfigError> {
        Ok(self.revisions().await?.keys().next_back().copied())
    }

    async fn load(&self, revision: Revision) -> Result<ConfigDocument, ConfigError> {
        let revisions = self.revisions().await?;
        let (path, format) = revisions
            .get(&revision)
            .ok_or(ConfigError::RevisionNotFound(revision))?;
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Self::backend_error(path, &e))?;
        let mut document = format.decode(&content).map_err(|e| match e {
            ConfigError::Serialization(msg) => {
                ConfigError::Serialization(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        if document.revision != revision {
            warn!(
                path = %path.display(),
                declared = %document.revision,
                "document revision differs from its file name, using the file name"
            );
            document.revision = revision;
        }
        debug!(path = %path.display(), %revision, "configuration loaded");
        Ok(document)
    }

    async fn save(&self, document: &ConfigDocument) -> Result<(), ConfigError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::backend_error(&self.dir, &e))?;

        let content = ConfigFormat::Json.encode(document)?;
        let path = self.dir.join(format!("{}.json", document.revision));
        let tmp = self.dir.join(format!(".{}.json.tmp", document.revision));
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| Self::backend_error(&tmp, &e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::backend_error(&path, &e))?;

        for ext in ConfigFormat::Yaml.extensions() {
            let stale = self.dir.join(format!("{}.{ext}", document.revision));
            match tokio::fs::remove_file(&stale).await {
                Ok(()) => debug!(path = %stale.display(), "removed superseded revision file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(Self::backend_error(&stale, &e)),
            }
        }

        debug!(path = %path.display(), revision = %document.revision, "configuration saved");
        Ok(())
    }
}

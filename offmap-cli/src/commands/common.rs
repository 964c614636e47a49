//! State shared by the archive commands.

use std::sync::Arc;

use offmap::config::ConfigFile;
use offmap::resolver::{ProtocolResolver, ResolveError};
use offmap::DiskStore;

use crate::error::CliError;

/// Loaded configuration plus the stores and resolvers built from it.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: ConfigFile,
}

impl CommandContext {
    pub fn new(config: ConfigFile) -> Self {
        Self { config }
    }

    /// The on-disk archive store, with the configured quota.
    pub fn store(&self) -> Arc<DiskStore> {
        Arc::new(
            DiskStore::new(&self.config.storage.directory).with_quota(self.config.storage.quota),
        )
    }

    pub fn resolver(&self) -> Arc<ProtocolResolver> {
        Arc::new(ProtocolResolver::new(self.store()))
    }
}

/// Turn a missing archive into a plain "not found" message.
pub fn archive_error(e: ResolveError) -> CliError {
    match e {
        ResolveError::NotFound { name } => CliError::NotFound(format!("Archive '{}'", name)),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offmap::ArchiveStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_uses_configured_directory_and_quota() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigFile::default();
        config.storage.directory = dir.path().join("store");
        config.storage.quota = Some(4096);

        let store = CommandContext::new(config).store();
        assert_eq!(store.root(), dir.path().join("store"));

        let estimate = store.estimate().await.unwrap().unwrap();
        assert_eq!(estimate.quota, 4096);
    }

    #[test]
    fn test_archive_error_maps_not_found() {
        let err = archive_error(ResolveError::NotFound {
            name: "paris".to_string(),
        });
        assert_eq!(err.to_string(), "Archive 'paris' not found");

        let err = archive_error(ResolveError::Aborted);
        assert!(matches!(err, CliError::Offmap(_)));
    }
}

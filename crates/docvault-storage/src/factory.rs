use crate::{DocumentStorage, SecureStorage, StorageResult};
use docvault_core::Config;
use std::sync::Arc;

/// Create the document storage described by configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn DocumentStorage>> {
    let storage =
        SecureStorage::new(config.storage_root.clone(), config.encryption_key.as_deref()).await?;
    Ok(Arc::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_storage_from_config() {
        let dir = tempdir().unwrap();
        let config = Config::with_storage_root(dir.path());

        let storage = create_storage(&config).await.unwrap();
        let handle = storage
            .store(b"hello".to_vec(), "abcdef0123", "hello.txt", true)
            .await
            .unwrap();
        assert!(handle.path.starts_with("abcdef01/"));
        assert_eq!(storage.retrieve(&handle.path, "abcdef0123").await.unwrap(), b"hello");
    }
}

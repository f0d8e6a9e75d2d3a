use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docvault_core::constants::{DOCUMENTS_DIR, STORAGE_SUBDIRS, TEMP_DIR};
use docvault_core::models::{StorageStats, StoredFileHandle, StoredFileInfo};
use docvault_core::{format_size, sha256_hex, EncryptionService};
use subtle::ConstantTimeEq;
use tokio::fs;
use uuid::Uuid;

use crate::key_store;
use crate::keys;
use crate::traits::{DocumentStorage, StorageError, StorageResult};

const PARTIAL_EXTENSION: &str = "partial";
const STALE_PARTIAL_AGE: Duration = Duration::from_secs(60 * 60);

/// Encrypted local-filesystem document storage.
///
/// Constructed once by the composition root and shared (it is cheap to clone).
/// Writes go to `temp/` first and are renamed into place, so a stored path
/// either holds complete content or does not exist.
#[derive(Clone)]
pub struct SecureStorage {
    root: PathBuf,
    documents: PathBuf,
    temp: PathBuf,
    encryption: EncryptionService,
}

impl std::fmt::Debug for SecureStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStorage")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl SecureStorage {
    /// Create the directory layout under `root` and load (or create) the encryption key.
    ///
    /// # Arguments
    /// * `root` - Storage root (e.g., "/var/lib/docvault")
    /// * `encryption_key` - Optional base64 key that replaces the key file
    pub async fn new(
        root: impl Into<PathBuf>,
        encryption_key: Option<&str>,
    ) -> StorageResult<Self> {
        let root = root.into();

        let layout = std::iter::once(root.clone())
            .chain(STORAGE_SUBDIRS.iter().map(|d| root.join(d)));
        for dir in layout {
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::io(
                    format!("Failed to create storage directory {}", dir.display()),
                    e,
                )
            })?;
        }

        let key = key_store::load_or_create(&root, encryption_key).await?;
        let encryption = EncryptionService::from_key_bytes(&key)?;

        let storage = SecureStorage {
            documents: root.join(DOCUMENTS_DIR),
            temp: root.join(TEMP_DIR),
            root,
            encryption,
        };
        storage.sweep_stale_partials(STALE_PARTIAL_AGE).await;

        tracing::info!(root = %storage.root.display(), "Initialized secure document storage");
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        keys::validate_relative_path(path)?;
        Ok(self.documents.join(path))
    }

    /// Resolve `path` for `owner_id`, failing before any filesystem access on a prefix mismatch.
    fn resolve_owned(&self, path: &str, owner_id: &str) -> StorageResult<PathBuf> {
        let full = self.resolve(path)?;
        if !keys::is_owned_by(path, owner_id) {
            tracing::warn!(
                path = %path,
                owner_prefix = %keys::owner_prefix(owner_id),
                "Storage access denied: owner prefix mismatch"
            );
            return Err(StorageError::AccessDenied);
        }
        Ok(full)
    }

    /// Remove `.partial` files in `temp/` older than `max_age`.
    ///
    /// They are left behind when a write is cancelled before its rename. Younger
    /// files may belong to a write still in flight in another process.
    async fn sweep_stale_partials(&self, max_age: Duration) {
        let mut entries = match fs::read_dir(&self.temp).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    dir = %self.temp.display(),
                    error = %e,
                    "Failed to scan temp directory"
                );
                return;
            }
        };

        let mut removed = 0usize;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PARTIAL_EXTENSION) {
                continue;
            }
            let stale = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified.elapsed().map(|age| age >= max_age).unwrap_or(false),
                Err(_) => false,
            };
            if stale && fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed = removed, "Removed stale partial writes");
        }
    }

    async fn write_atomically(&self, full: &Path, payload: &[u8]) -> StorageResult<()> {
        let partial = self
            .temp
            .join(format!("{}.{}", Uuid::new_v4(), PARTIAL_EXTENSION));

        if let Err(e) = key_store::write_private(&partial, payload).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }

        let parent = full.parent().unwrap_or(self.documents.as_path());
        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Err(e) = fs::create_dir_all(parent).await {
                let _ = fs::remove_file(&partial).await;
                return Err(StorageError::io(
                    format!("Failed to create directory {}", parent.display()),
                    e,
                ));
            }

            match fs::rename(&partial, full).await {
                Ok(()) => return Ok(()),
                // A concurrent delete may prune the fresh directory between the two calls.
                Err(e) if e.kind() == ErrorKind::NotFound && attempt < 2 => continue,
                Err(e) => {
                    let _ = fs::remove_file(&partial).await;
                    return Err(StorageError::io(
                        format!("Failed to move file into place at {}", full.display()),
                        e,
                    ));
                }
            }
        }
    }

    /// Remove empty directories from `dir` upwards, stopping below `documents/`.
    async fn prune_empty_dirs(&self, dir: Option<&Path>) {
        let mut current = dir.map(Path::to_path_buf);
        while let Some(dir) = current {
            if dir == self.documents || !dir.starts_with(&self.documents) {
                break;
            }
            if let Err(e) = fs::remove_dir(&dir).await {
                tracing::debug!(
                    dir = %dir.display(),
                    error = %e,
                    "Stopped pruning storage directories"
                );
                break;
            }
            tracing::debug!(dir = %dir.display(), "Removed empty storage directory");
            current = dir.parent().map(Path::to_path_buf);
        }
    }
}

#[async_trait]
impl DocumentStorage for SecureStorage {
    async fn store(
        &self,
        content: Vec<u8>,
        owner_id: &str,
        original_filename: &str,
        encrypt: bool,
    ) -> StorageResult<StoredFileHandle> {
        keys::checked_owner_prefix(owner_id)?;
        let relative = keys::generate_storage_path(owner_id, original_filename, Utc::now());
        let full = self.resolve(&relative)?;
        let start = Instant::now();

        let encryption = self.encryption.clone();
        let (content_hash, size, payload) = tokio::task::spawn_blocking(move || {
            let content_hash = sha256_hex(&content);
            let size = content.len() as u64;
            let payload = if encrypt {
                encryption.encrypt(&content)?
            } else {
                content
            };
            Ok::<_, StorageError>((content_hash, size, payload))
        })
        .await
        .map_err(|e| StorageError::Backend(format!("Storage worker failed: {}", e)))??;

        if let Err(e) = self.write_atomically(&full, &payload).await {
            tracing::error!(
                path = %relative,
                error = %e,
                "Failed to store file"
            );
            return Err(e);
        }

        tracing::info!(
            path = %relative,
            size_bytes = size,
            encrypted = encrypt,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stored file"
        );

        Ok(StoredFileHandle {
            path: relative,
            content_hash,
            size,
            encrypted: encrypt,
        })
    }

    async fn retrieve(&self, path: &str, owner_id: &str) -> StorageResult<Vec<u8>> {
        let full = self.resolve_owned(path, owner_id)?;
        let start = Instant::now();

        let raw = match fs::read(&full).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Failed to read stored file");
                return Err(StorageError::io(format!("Failed to read file {}", path), e));
            }
        };

        let encryption = self.encryption.clone();
        let log_path = path.to_string();
        let content = tokio::task::spawn_blocking(move || match encryption.decrypt(&raw) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                // Content written without encryption; hand it back as-is.
                tracing::warn!(
                    path = %log_path,
                    error = %e,
                    "Failed to decrypt stored file, returning raw content"
                );
                raw
            }
        })
        .await
        .map_err(|e| StorageError::Backend(format!("Storage worker failed: {}", e)))?;

        tracing::debug!(
            path = %path,
            size_bytes = content.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Retrieved file"
        );

        Ok(content)
    }

    async fn delete(&self, path: &str, owner_id: &str) -> StorageResult<bool> {
        let full = self.resolve_owned(path, owner_id)?;

        match fs::remove_file(&full).await {
            Ok(()) => {
                tracing::info!(path = %path, "Deleted file");
                self.prune_empty_dirs(full.parent()).await;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path, "File not found for deletion");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Failed to delete file");
                Err(StorageError::io(format!("Failed to delete file {}", path), e))
            }
        }
    }

    async fn verify_integrity(&self, path: &str, expected_hash: &str, owner_id: &str) -> bool {
        let content = match self.retrieve(path, owner_id).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Integrity verification failed");
                return false;
            }
        };

        let actual_hash = match tokio::task::spawn_blocking(move || sha256_hex(&content)).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "Integrity verification failed");
                return false;
            }
        };

        let expected = expected_hash.trim().to_ascii_lowercase();
        let matches: bool = actual_hash.as_bytes().ct_eq(expected.as_bytes()).into();
        if !matches {
            tracing::warn!(path = %path, "File integrity check failed");
        }
        matches
    }

    async fn file_info(&self, path: &str) -> StorageResult<StoredFileInfo> {
        let full = self.resolve(path)?;
        let meta = match fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(StorageError::NotFound(path.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => {
                return Err(StorageError::io(
                    format!("Failed to read metadata for {}", path),
                    e,
                ))
            }
        };

        Ok(StoredFileInfo {
            path: path.to_string(),
            size_on_disk: meta.len(),
            modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn stats(&self) -> StorageResult<StorageStats> {
        let (file_count, total_size_bytes) = tally_files(vec![self.documents.clone()]).await?;

        Ok(StorageStats {
            file_count,
            total_size_bytes,
            total_size_human: format_size(total_size_bytes),
        })
    }
}

/// File count and total size under `dirs`, recursively.
///
/// Directories pruned by a concurrent delete while the walk is underway are skipped.
async fn tally_files(mut pending: Vec<PathBuf>) -> StorageResult<(u64, u64)> {
    let mut file_count = 0u64;
    let mut total_size_bytes = 0u64;

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(StorageError::io(
                    format!("Failed to list directory {}", dir.display()),
                    e,
                ))
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => {
                    return Err(StorageError::io(
                        format!("Failed to list directory {}", dir.display()),
                        e,
                    ))
                }
            };
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                // Removed while we were walking.
                Err(_) => continue,
            };
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                if let Ok(meta) = entry.metadata().await {
                    file_count += 1;
                    total_size_bytes += meta.len();
                }
            }
        }
    }

    Ok((file_count, total_size_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    const OWNER: &str = "3f2a9c41-7d0e-4b8a-9c55-2f1e6c3b9a10";
    const OTHER_OWNER: &str = "9b1d7e22-1111-4222-8333-444455556666";

    async fn test_storage(dir: &Path) -> SecureStorage {
        SecureStorage::new(dir, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_new_creates_layout() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;

        for sub in STORAGE_SUBDIRS {
            assert!(dir.path().join(sub).is_dir(), "{sub} missing");
        }
        assert!(key_store::key_path(dir.path()).is_file());
        assert_eq!(storage.root(), dir.path());
    }

    #[tokio::test]
    async fn test_store_retrieve_plaintext_round_trip() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let content = b"plain quarterly numbers".to_vec();

        let handle = storage
            .store(content.clone(), OWNER, "numbers.txt", false)
            .await
            .unwrap();
        assert_eq!(handle.size, content.len() as u64);
        assert!(!handle.encrypted);
        assert!(handle.path.starts_with("3f2a9c41/"));
        assert!(handle.path.ends_with(".txt"));

        let on_disk = std::fs::read(dir.path().join(DOCUMENTS_DIR).join(&handle.path)).unwrap();
        assert_eq!(on_disk, content);

        let retrieved = storage.retrieve(&handle.path, OWNER).await.unwrap();
        assert_eq!(sha256_hex(&retrieved), handle.content_hash);
        assert_eq!(retrieved, content);
    }

    #[tokio::test]
    async fn test_store_retrieve_encrypted_round_trip() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let content = b"confidential merger memo".to_vec();

        let handle = storage
            .store(content.clone(), OWNER, "memo.pdf", true)
            .await
            .unwrap();
        assert!(handle.encrypted);
        assert_eq!(handle.size, content.len() as u64);
        assert_eq!(handle.content_hash, sha256_hex(&content));

        let on_disk = std::fs::read(dir.path().join(DOCUMENTS_DIR).join(&handle.path)).unwrap();
        assert_ne!(on_disk, content);
        assert_eq!(on_disk.len(), content.len() + 28);

        let retrieved = storage.retrieve(&handle.path, OWNER).await.unwrap();
        assert_eq!(retrieved, content);
    }

    #[tokio::test]
    async fn test_key_survives_restart() {
        let dir = tempdir().unwrap();
        let content = b"written before restart".to_vec();

        let handle = {
            let storage = test_storage(dir.path()).await;
            storage.store(content.clone(), OWNER, "a.txt", true).await.unwrap()
        };

        let reopened = test_storage(dir.path()).await;
        assert_eq!(reopened.retrieve(&handle.path, OWNER).await.unwrap(), content);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stored_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let handle = storage.store(b"x".to_vec(), OWNER, "a.txt", false).await.unwrap();

        let mode = std::fs::metadata(dir.path().join(DOCUMENTS_DIR).join(&handle.path))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_store_leaves_no_partial_files() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        storage.store(b"x".to_vec(), OWNER, "a.txt", true).await.unwrap();

        let temp_entries = std::fs::read_dir(dir.path().join(TEMP_DIR)).unwrap().count();
        assert_eq!(temp_entries, 0);
    }

    #[tokio::test]
    async fn test_store_rejects_unusable_owner() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        assert!(matches!(
            storage.store(b"x".to_vec(), "", "a.txt", false).await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.store(b"x".to_vec(), "../../etc", "a.txt", false).await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_with_wrong_owner_is_denied() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let handle = storage.store(b"mine".to_vec(), OWNER, "a.txt", true).await.unwrap();

        assert!(matches!(
            storage.retrieve(&handle.path, OTHER_OWNER).await,
            Err(StorageError::AccessDenied)
        ));
        // Same answer for a path that does not exist, so existence does not leak.
        assert!(matches!(
            storage
                .retrieve("3f2a9c41/2026/01/missing.txt", OTHER_OWNER)
                .await,
            Err(StorageError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn test_retrieve_missing_and_traversal() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;

        assert!(matches!(
            storage.retrieve("3f2a9c41/2026/01/missing.txt", OWNER).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.retrieve("3f2a9c41/../../.encryption_key", OWNER).await,
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_falls_back_to_raw_bytes() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;

        // Written unencrypted; decrypt fails and the raw bytes come back.
        let handle = storage
            .store(b"legacy plaintext content".to_vec(), OWNER, "a.txt", false)
            .await
            .unwrap();
        assert_eq!(
            storage.retrieve(&handle.path, OWNER).await.unwrap(),
            b"legacy plaintext content"
        );
    }

    #[tokio::test]
    async fn test_delete_prunes_empty_directories() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let handle = storage.store(b"x".to_vec(), OWNER, "a.txt", false).await.unwrap();

        assert!(storage.delete(&handle.path, OWNER).await.unwrap());

        let documents = dir.path().join(DOCUMENTS_DIR);
        assert!(documents.is_dir());
        assert!(!documents.join("3f2a9c41").exists());
        for sub in STORAGE_SUBDIRS {
            assert!(dir.path().join(sub).is_dir());
        }
    }

    #[tokio::test]
    async fn test_delete_keeps_siblings() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let first = storage.store(b"1".to_vec(), OWNER, "a.txt", false).await.unwrap();
        let second = storage.store(b"2".to_vec(), OWNER, "b.txt", false).await.unwrap();

        assert!(storage.delete(&first.path, OWNER).await.unwrap());
        assert_eq!(storage.retrieve(&second.path, OWNER).await.unwrap(), b"2");
    }

    #[tokio::test]
    async fn test_delete_twice_returns_false() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let handle = storage.store(b"x".to_vec(), OWNER, "a.txt", false).await.unwrap();

        assert!(storage.delete(&handle.path, OWNER).await.unwrap());
        assert!(!storage.delete(&handle.path, OWNER).await.unwrap());
        assert!(matches!(
            storage.retrieve(&handle.path, OWNER).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_with_wrong_owner_is_denied() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let handle = storage.store(b"x".to_vec(), OWNER, "a.txt", false).await.unwrap();

        assert!(matches!(
            storage.delete(&handle.path, OTHER_OWNER).await,
            Err(StorageError::AccessDenied)
        ));
        assert!(storage.retrieve(&handle.path, OWNER).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_integrity() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;
        let handle = storage
            .store(b"integrity checked".to_vec(), OWNER, "a.txt", false)
            .await
            .unwrap();

        assert!(storage.verify_integrity(&handle.path, &handle.content_hash, OWNER).await);
        assert!(
            storage
                .verify_integrity(&handle.path, &handle.content_hash.to_uppercase(), OWNER)
                .await
        );
        assert!(!storage.verify_integrity(&handle.path, "deadbeef", OWNER).await);
        assert!(
            !storage
                .verify_integrity(&handle.path, &handle.content_hash, OTHER_OWNER)
                .await
        );
        assert!(
            !storage
                .verify_integrity("3f2a9c41/2026/01/missing.txt", &handle.content_hash, OWNER)
                .await
        );
    }

    #[tokio::test]
    async fn test_flipped_byte_fails_integrity() {
        for encrypt in [false, true] {
            let dir = tempdir().unwrap();
            let storage = test_storage(dir.path()).await;
            let handle = storage
                .store(b"every byte counts".to_vec(), OWNER, "a.txt", encrypt)
                .await
                .unwrap();

            let on_disk = dir.path().join(DOCUMENTS_DIR).join(&handle.path);
            let mut bytes = std::fs::read(&on_disk).unwrap();
            let last = bytes.len() - 1;
            bytes[last] ^= 0x01;
            std::fs::write(&on_disk, &bytes).unwrap();

            assert!(
                !storage
                    .verify_integrity(&handle.path, &handle.content_hash, OWNER)
                    .await,
                "encrypt={encrypt}"
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_stores_never_collide() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(test_storage(dir.path()).await);
        let content = b"identical content".to_vec();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let storage = storage.clone();
                let content = content.clone();
                tokio::spawn(async move {
                    storage.store(content, OWNER, "same.txt", true).await.unwrap()
                })
            })
            .collect();

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            let stored = handle.await.unwrap();
            assert_eq!(stored.content_hash, sha256_hex(&content));
            paths.insert(stored.path);
        }
        assert_eq!(paths.len(), 16);
    }

    #[tokio::test]
    async fn test_file_info_and_stats() {
        let dir = tempdir().unwrap();
        let storage = test_storage(dir.path()).await;

        let empty = storage.stats().await.unwrap();
        assert_eq!(empty.file_count, 0);
        assert_eq!(empty.total_size_human, "0.0 B");

        let a = storage.store(vec![b'a'; 100], OWNER, "a.txt", false).await.unwrap();
        storage.store(vec![b'b'; 50], OTHER_OWNER, "b.txt", true).await.unwrap();

        let info = storage.file_info(&a.path).await.unwrap();
        assert_eq!(info.size_on_disk, 100);
        assert!(info.modified_at.is_some());

        let stats = storage.stats().await.unwrap();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_size_bytes, 100 + 50 + 28);

        assert!(matches!(
            storage.file_info("3f2a9c41/2026/01/missing.txt").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_new_reports_directory_failure_with_cause() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = SecureStorage::new(blocker.join("vault"), None)
            .await
            .err()
            .unwrap();
        match &err {
            StorageError::Io { context, .. } => {
                assert!(context.starts_with("Failed to create storage directory"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_tally_skips_vanished_directories() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present");
        std::fs::create_dir_all(&present).unwrap();
        std::fs::write(present.join("a.bin"), [0u8; 10]).unwrap();

        let (count, size) = tally_files(vec![dir.path().join("gone"), present])
            .await
            .unwrap();
        assert_eq!((count, size), (1, 10));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stats_survives_concurrent_deletes() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(test_storage(dir.path()).await);

        for _ in 0..100 {
            let handle = storage
                .store(b"x".to_vec(), OWNER, "a.txt", false)
                .await
                .unwrap();
            let deleter = {
                let storage = storage.clone();
                tokio::spawn(async move { storage.delete(&handle.path, OWNER).await })
            };
            storage.stats().await.unwrap();
            assert!(deleter.await.unwrap().unwrap());
        }

        assert_eq!(storage.stats().await.unwrap().file_count, 0);
    }

    #[tokio::test]
    async fn test_new_sweeps_only_stale_partials() {
        let dir = tempdir().unwrap();
        drop(test_storage(dir.path()).await);

        let temp = dir.path().join(TEMP_DIR);
        let stale = temp.join("old.partial");
        let fresh = temp.join("new.partial");
        let other = temp.join("keep.tmp");
        for path in [&stale, &fresh, &other] {
            std::fs::write(path, b"x").unwrap();
        }
        let two_hours_ago = std::time::SystemTime::now() - Duration::from_secs(2 * 60 * 60);
        for path in [&stale, &other] {
            std::fs::File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(two_hours_ago)
                .unwrap();
        }

        test_storage(dir.path()).await;

        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(other.exists());
    }
}

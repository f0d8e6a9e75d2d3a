//! Encryption key lifecycle.
//!
//! The key is created on first use and never rotated. Creation publishes a
//! fully written temp file with `hard_link`, which fails if the key already
//! exists, so racing initializers (threads or processes) all end up with the
//! key that won.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use docvault_core::constants::ENCRYPTION_KEY_FILE;
use docvault_core::encryption::{decode_key, EncryptionService};
use docvault_core::KEY_LEN;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

pub fn key_path(root: &Path) -> PathBuf {
    root.join(ENCRYPTION_KEY_FILE)
}

/// Resolve the key: an explicit base64 override wins, else load or create the key file.
pub async fn load_or_create(root: &Path, override_key: Option<&str>) -> StorageResult<Vec<u8>> {
    if let Some(encoded) = override_key {
        tracing::debug!("Using encryption key from configuration");
        return decode_key(encoded).map_err(|e| StorageError::Key(e.to_string()));
    }

    let path = key_path(root);
    match read_key(&path).await {
        Ok(key) => return Ok(key),
        Err(StorageError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    create_key(root, &path).await
}

async fn read_key(path: &Path) -> StorageResult<Vec<u8>> {
    let key = match fs::read(path).await {
        Ok(key) => key,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StorageError::NotFound(path.display().to_string()))
        }
        Err(e) => {
            return Err(StorageError::io(
                format!("Failed to read encryption key {}", path.display()),
                e,
            ))
        }
    };

    if key.len() != KEY_LEN {
        return Err(StorageError::Key(format!(
            "Key file {} holds {} bytes, expected {}",
            path.display(),
            key.len(),
            KEY_LEN
        )));
    }

    Ok(key)
}

async fn create_key(root: &Path, path: &Path) -> StorageResult<Vec<u8>> {
    let key = EncryptionService::generate_key();
    let temp_path = root.join(format!("{}.{}.tmp", ENCRYPTION_KEY_FILE, Uuid::new_v4()));

    if let Err(e) = write_private(&temp_path, &key).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    let linked = fs::hard_link(&temp_path, path).await;
    let _ = fs::remove_file(&temp_path).await;

    match linked {
        Ok(()) => {
            tracing::info!(
                path = %path.display(),
                "Generated new encryption key for document storage"
            );
            Ok(key)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::debug!(
                path = %path.display(),
                "Encryption key created concurrently, loading it"
            );
            read_key(path).await
        }
        Err(e) => Err(StorageError::io(
            format!("Failed to publish encryption key {}", path.display()),
            e,
        )),
    }
}

/// Write `data` to a new file readable only by the owner, and flush it to disk.
pub async fn write_private(path: &Path, data: &[u8]) -> StorageResult<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|e| StorageError::io(format!("Failed to create file {}", path.display()), e))?;

    file.write_all(data)
        .await
        .map_err(|e| StorageError::io(format!("Failed to write file {}", path.display()), e))?;

    file.sync_all()
        .await
        .map_err(|e| StorageError::io(format!("Failed to sync file {}", path.display()), e))?;

    Ok(())
}

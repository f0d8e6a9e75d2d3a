//! Storage abstraction trait
//!
//! The document service talks to storage only through [`DocumentStorage`].

use async_trait::async_trait;
use docvault_core::encryption::EncryptionError;
use docvault_core::models::{StorageStats, StoredFileHandle, StoredFileInfo};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    /// Owner prefix mismatch. The message deliberately says nothing about the file.
    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("Encryption key error: {0}")]
    Key(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Hash, optionally encrypt and persist `content` under a fresh path.
    ///
    /// Nothing is returned unless the bytes are fully on disk.
    async fn store(
        &self,
        content: Vec<u8>,
        owner_id: &str,
        original_filename: &str,
        encrypt: bool,
    ) -> StorageResult<StoredFileHandle>;

    /// Read and, when possible, decrypt the file at `path`.
    async fn retrieve(&self, path: &str, owner_id: &str) -> StorageResult<Vec<u8>>;

    /// Remove the file at `path`. Returns `false` if it was already gone.
    async fn delete(&self, path: &str, owner_id: &str) -> StorageResult<bool>;

    /// Whether the stored plaintext hashes to `expected_hash`.
    ///
    /// Advisory only: every failure is reported as `false`.
    async fn verify_integrity(&self, path: &str, expected_hash: &str, owner_id: &str) -> bool;

    async fn file_info(&self, path: &str) -> StorageResult<StoredFileInfo>;

    async fn stats(&self) -> StorageResult<StorageStats>;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What secure storage hands back after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFileHandle {
    /// Path relative to the storage root; the only identifier needed to read or delete the file.
    pub path: String,
    /// Hex SHA-256 of the plaintext, computed before encryption.
    pub content_hash: String,
    /// Plaintext size in bytes.
    pub size: u64,
    pub encrypted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFileInfo {
    pub path: String,
    /// Size on disk, including encryption overhead.
    pub size_on_disk: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub file_count: u64,
    pub total_size_bytes: u64,
    pub total_size_human: String,
}

/// An owner's usage as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub document_count: i64,
    pub total_size_bytes: i64,
    pub total_size_human: String,
    pub ready_count: i64,
    pub processing_count: i64,
    pub error_count: i64,
    pub storage_limit_bytes: i64,
    pub storage_limit_human: String,
}

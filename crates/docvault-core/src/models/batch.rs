use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCheckStatus {
    Valid,
    Invalid,
}

/// Outcome of validating one file in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCheck {
    pub filename: String,
    pub status: FileCheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Combined size of the valid files.
    pub total_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchValidation {
    pub results: Vec<FileCheck>,
    pub summary: BatchSummary,
}

/// Upload limits currently in force, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    pub allowed_mime_types: Vec<String>,
    pub max_file_size_bytes: usize,
    pub max_file_size_human: String,
    pub max_files_per_user: i64,
    pub max_batch_files: usize,
    pub max_batch_size_bytes: usize,
    /// Extensions rejected anywhere in a filename.
    pub dangerous_extensions: Vec<String>,
}

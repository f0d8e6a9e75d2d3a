use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Ready,
    Error,
    Deleted,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Error => "error",
            DocumentStatus::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploading" => Ok(DocumentStatus::Uploading),
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            "error" => Ok(DocumentStatus::Error),
            "deleted" => Ok(DocumentStatus::Deleted),
            other => Err(format!("Unknown document status: {}", other)),
        }
    }
}

/// Coarse document classification derived from the detected MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Word,
    Excel,
    Powerpoint,
    Text,
    Csv,
    Json,
    Other,
}

impl DocumentType {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.to_lowercase().as_str() {
            "application/pdf" => DocumentType::Pdf,
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                DocumentType::Word
            }
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                DocumentType::Excel
            }
            "application/vnd.ms-powerpoint"
            | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                DocumentType::Powerpoint
            }
            "text/plain" => DocumentType::Text,
            "text/csv" => DocumentType::Csv,
            "application/json" => DocumentType::Json,
            _ => DocumentType::Other,
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(DocumentType::Pdf),
            "word" => Ok(DocumentType::Word),
            "excel" => Ok(DocumentType::Excel),
            "powerpoint" => Ok(DocumentType::Powerpoint),
            "text" => Ok(DocumentType::Text),
            "csv" => Ok(DocumentType::Csv),
            "json" => Ok(DocumentType::Json),
            "other" => Ok(DocumentType::Other),
            other => Err(format!("Unknown document type: {}", other)),
        }
    }
}

/// Persisted document metadata. The file itself lives in secure storage at `storage_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub title: String,
    pub description: Option<String>,
    pub file_size: i64,
    pub file_type: DocumentType,
    pub mime_type: String,
    pub file_hash: String,
    pub storage_path: String,
    pub status: DocumentStatus,
    pub is_encrypted: bool,
    pub is_sensitive: bool,
    pub view_count: i32,
    pub download_count: i32,
    pub last_accessed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processing_completed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }

    pub fn is_deleted(&self) -> bool {
        self.status == DocumentStatus::Deleted
    }
}

/// Caller-supplied fields for a new upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_sensitive: Option<bool>,
}

impl DocumentUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_sensitive.is_none()
    }
}

/// Filters and paging for listing an owner's documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentQuery {
    pub status: Option<DocumentStatus>,
    pub file_type: Option<DocumentType>,
    /// Case-insensitive substring over title, description and filename.
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            status: None,
            file_type: None,
            search: None,
            offset: 0,
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPage {
    pub documents: Vec<DocumentResponse>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

/// Per-owner aggregate over non-deleted documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct DocumentStats {
    pub document_count: i64,
    pub total_size_bytes: i64,
    pub ready_count: i64,
    pub processing_count: i64,
    pub error_count: i64,
}

/// Client-facing view of a document. Omits the storage path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub filename: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file_size: i64,
    pub file_type: DocumentType,
    pub mime_type: String,
    pub file_hash: String,
    pub status: DocumentStatus,
    pub is_encrypted: bool,
    pub is_sensitive: bool,
    pub download_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        DocumentResponse {
            id: doc.id,
            filename: doc.filename,
            title: doc.title,
            description: doc.description,
            file_size: doc.file_size,
            file_type: doc.file_type,
            mime_type: doc.mime_type,
            file_hash: doc.file_hash,
            status: doc.status,
            is_encrypted: doc.is_encrypted,
            is_sensitive: doc.is_sensitive,
            download_count: doc.download_count,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_mime() {
        assert_eq!(DocumentType::from_mime("application/pdf"), DocumentType::Pdf);
        assert_eq!(
            DocumentType::from_mime(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            DocumentType::Word
        );
        assert_eq!(DocumentType::from_mime("application/vnd.ms-excel"), DocumentType::Excel);
        assert_eq!(DocumentType::from_mime("TEXT/CSV"), DocumentType::Csv);
        assert_eq!(DocumentType::from_mime("image/png"), DocumentType::Other);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            DocumentStatus::Uploading,
            DocumentStatus::Processing,
            DocumentStatus::Ready,
            DocumentStatus::Error,
            DocumentStatus::Deleted,
        ] {
            assert_eq!(status.to_string().parse::<DocumentStatus>(), Ok(status));
        }
        assert!("archived".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_document_response_hides_storage_path() {
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            filename: "plan.pdf".to_string(),
            title: "Plan".to_string(),
            description: None,
            file_size: 2048,
            file_type: DocumentType::Pdf,
            mime_type: "application/pdf".to_string(),
            file_hash: "ab".repeat(32),
            storage_path: "documents/1234abcd/2026/10/x.pdf".to_string(),
            status: DocumentStatus::Ready,
            is_encrypted: true,
            is_sensitive: false,
            view_count: 0,
            download_count: 3,
            last_accessed: None,
            created_at: now,
            updated_at: now,
            processing_completed_at: Some(now),
        };

        let response = DocumentResponse::from(document.clone());
        assert_eq!(response.id, document.id);
        assert_eq!(response.download_count, 3);

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("storage_path"));
        assert!(!json.contains("description"));
        assert!(json.contains("\"status\":\"ready\""));
        assert!(json.contains("\"file_type\":\"pdf\""));
    }
}

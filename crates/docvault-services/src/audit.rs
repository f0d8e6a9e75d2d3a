//! Audit logging for document lifecycle events
//!
//! Entries are emitted on the `audit` tracing target so they can be routed
//! separately (e.g. `RUST_LOG=audit=info`).

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    DocumentCreated,
    DocumentUpdated,
    DocumentDeleted,
    DocumentDownloaded,
    UploadRejected,
    IntegrityCheckFailed,
}

/// Structured audit log entry
#[derive(Debug, Serialize)]
pub struct AuditLogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    pub owner_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditLogEntry {
    pub fn new(event_type: AuditEventType, owner_id: Uuid) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            owner_id,
            document_id: None,
            details: None,
            success: true,
            error_message: None,
        }
    }

    pub fn with_document_id(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_failure(mut self, error_message: String) -> Self {
        self.success = false;
        self.error_message = Some(error_message);
        self
    }

    pub fn log(&self) {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());

        if self.success {
            tracing::event!(
                target: "audit",
                tracing::Level::INFO,
                audit_entry = %json,
                event_type = ?self.event_type,
                owner_id = %self.owner_id,
                document_id = ?self.document_id,
                success = self.success,
                "Document audit log"
            );
        } else {
            tracing::event!(
                target: "audit",
                tracing::Level::WARN,
                audit_entry = %json,
                event_type = ?self.event_type,
                owner_id = %self.owner_id,
                document_id = ?self.document_id,
                success = self.success,
                error = ?self.error_message,
                "Document audit log - failure"
            );
        }
    }
}

pub fn log_document_created(
    owner_id: Uuid,
    document_id: Uuid,
    filename: &str,
    file_size: i64,
    mime_type: &str,
    encrypted: bool,
) {
    AuditLogEntry::new(AuditEventType::DocumentCreated, owner_id)
        .with_document_id(document_id)
        .with_details(serde_json::json!({
            "filename": filename,
            "file_size": file_size,
            "mime_type": mime_type,
            "encrypted": encrypted,
        }))
        .log();
}

pub fn log_upload_rejected(owner_id: Uuid, filename: &str, reason: String) {
    AuditLogEntry::new(AuditEventType::UploadRejected, owner_id)
        .with_details(serde_json::json!({ "filename": filename }))
        .with_failure(reason)
        .log();
}

pub fn log_document_updated(owner_id: Uuid, document_id: Uuid) {
    AuditLogEntry::new(AuditEventType::DocumentUpdated, owner_id)
        .with_document_id(document_id)
        .log();
}

pub fn log_document_deleted(owner_id: Uuid, document_id: Uuid, filename: &str, hard: bool) {
    AuditLogEntry::new(AuditEventType::DocumentDeleted, owner_id)
        .with_document_id(document_id)
        .with_details(serde_json::json!({
            "filename": filename,
            "hard_delete": hard,
        }))
        .log();
}

pub fn log_document_downloaded(owner_id: Uuid, document_id: Uuid, size: usize) {
    AuditLogEntry::new(AuditEventType::DocumentDownloaded, owner_id)
        .with_document_id(document_id)
        .with_details(serde_json::json!({ "size": size }))
        .log();
}

pub fn log_integrity_failure(owner_id: Uuid, document_id: Uuid) {
    AuditLogEntry::new(AuditEventType::IntegrityCheckFailed, owner_id)
        .with_document_id(document_id)
        .with_failure("Stored content does not match recorded hash".to_string())
        .log();
}

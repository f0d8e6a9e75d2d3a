use std::sync::Arc;

use chrono::Utc;
use docvault_core::models::{
    Document, DocumentPage, DocumentQuery, DocumentResponse, DocumentStatus, DocumentType,
    DocumentUpdate, NewDocument, StorageUsage,
};
use docvault_core::{format_size, AppError, Config, FileValidator};
use docvault_db::DocumentRepositoryTrait;
use docvault_storage::{DocumentStorage, StorageError};
use uuid::Uuid;

use crate::audit;

const MAX_PAGE_SIZE: i64 = 1000;
const MAX_TITLE_LENGTH: usize = 500;

/// Document lifecycle: validate, store, record, serve and remove.
///
/// Every operation is scoped to an owner. The storage path of a record is
/// always written by `create_document` from the handle storage returned, so
/// a record never points outside its owner's prefix.
#[derive(Clone)]
pub struct DocumentService {
    pub(super) validator: FileValidator,
    pub(super) storage: Arc<dyn DocumentStorage>,
    pub(super) repository: Arc<dyn DocumentRepositoryTrait>,
    pub(super) config: Config,
}

/// Storage failures as seen by callers; a path outside the owner's prefix reads as missing.
pub fn storage_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(_) | StorageError::AccessDenied => {
            AppError::NotFound("Document file not found".to_string())
        }
        StorageError::InvalidPath(reason) => AppError::InvalidInput(reason),
        other => AppError::Storage(other.to_string()),
    }
}

/// Key under which an owner's files are stored.
pub fn owner_key(owner_id: Uuid) -> String {
    owner_id.simple().to_string()
}

fn document_not_found() -> AppError {
    AppError::NotFound("Document not found".to_string())
}

fn check_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Title too long (max {} characters)",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

impl DocumentService {
    pub fn new(
        config: Config,
        storage: Arc<dyn DocumentStorage>,
        repository: Arc<dyn DocumentRepositoryTrait>,
    ) -> Self {
        Self {
            validator: FileValidator::from_config(&config),
            storage,
            repository,
            config,
        }
    }

    /// Validate, store and record a new document.
    ///
    /// Nothing is recorded when validation or the write fails. When recording
    /// fails the stored file is removed again.
    #[tracing::instrument(
        skip(self, content, new),
        fields(owner_id = %owner_id, filename = %filename, size = content.len())
    )]
    pub async fn create_document(
        &self,
        owner_id: Uuid,
        content: Vec<u8>,
        filename: &str,
        new: NewDocument,
    ) -> Result<Document, AppError> {
        if let Some(title) = &new.title {
            check_title(title)?;
        }

        let used = self.repository.count_active(owner_id).await?;
        if used >= self.config.max_files_per_user {
            tracing::warn!(
                used = used,
                limit = self.config.max_files_per_user,
                "Document quota reached"
            );
            return Err(AppError::QuotaExceeded {
                used,
                limit: self.config.max_files_per_user,
            });
        }

        let validation = match self.validator.validate(&content, filename) {
            Ok(validation) => validation,
            Err(e) => {
                audit::log_upload_rejected(owner_id, filename, e.to_string());
                return Err(e.into());
            }
        };

        let encrypt = self.config.enable_file_encryption || new.is_sensitive;
        let storage_owner = owner_key(owner_id);
        let handle = self
            .storage
            .store(content, &storage_owner, &validation.filename, encrypt)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to store document");
                storage_error(e)
            })?;

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            owner_id,
            filename: validation.filename.clone(),
            title: new
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| validation.filename.clone()),
            description: new.description,
            file_size: handle.size as i64,
            file_type: DocumentType::from_mime(&validation.mime_type),
            mime_type: validation.mime_type.clone(),
            file_hash: handle.content_hash.clone(),
            storage_path: handle.path.clone(),
            status: DocumentStatus::Ready,
            is_encrypted: handle.encrypted,
            is_sensitive: new.is_sensitive,
            view_count: 0,
            download_count: 0,
            last_accessed: None,
            created_at: now,
            updated_at: now,
            processing_completed_at: Some(now),
        };

        let document = match self.repository.insert(&document).await {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    storage_path = %handle.path,
                    "Failed to record document, removing stored file"
                );
                if let Err(cleanup) = self.storage.delete(&handle.path, &storage_owner).await {
                    tracing::error!(
                        error = %cleanup,
                        storage_path = %handle.path,
                        "Failed to remove orphaned file"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            document_id = %document.id,
            storage_path = %document.storage_path,
            mime_type = %document.mime_type,
            encrypted = document.is_encrypted,
            "Document created"
        );
        audit::log_document_created(
            owner_id,
            document.id,
            &document.filename,
            document.file_size,
            &document.mime_type,
            document.is_encrypted,
        );

        Ok(document)
    }

    pub async fn get_document(&self, owner_id: Uuid, id: Uuid) -> Result<Document, AppError> {
        self.repository
            .get(owner_id, id)
            .await?
            .ok_or_else(document_not_found)
    }

    pub async fn list_documents(
        &self,
        owner_id: Uuid,
        mut query: DocumentQuery,
    ) -> Result<DocumentPage, AppError> {
        query.limit = query.limit.clamp(1, MAX_PAGE_SIZE);
        query.offset = query.offset.max(0);

        let (documents, total) = self.repository.list(owner_id, &query).await?;

        Ok(DocumentPage {
            documents: documents.into_iter().map(DocumentResponse::from).collect(),
            total,
            offset: query.offset,
            limit: query.limit,
        })
    }

    pub async fn update_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Document, AppError> {
        if update.is_empty() {
            return Err(AppError::InvalidInput("No fields to update".to_string()));
        }
        if let Some(title) = &update.title {
            check_title(title)?;
        }

        let document = self
            .repository
            .update(owner_id, id, &update)
            .await?
            .ok_or_else(document_not_found)?;

        audit::log_document_updated(owner_id, id);
        Ok(document)
    }

    /// Soft delete hides the record and keeps the file. Hard delete removes
    /// the record, then the file; a file that cannot be removed is logged
    /// and left behind.
    #[tracing::instrument(skip(self), fields(owner_id = %owner_id, document_id = %id))]
    pub async fn delete_document(
        &self,
        owner_id: Uuid,
        id: Uuid,
        hard: bool,
    ) -> Result<(), AppError> {
        if !hard {
            let filename = self.get_document(owner_id, id).await?.filename;
            if !self.repository.mark_deleted(owner_id, id).await? {
                return Err(document_not_found());
            }
            audit::log_document_deleted(owner_id, id, &filename, false);
            return Ok(());
        }

        let document = self.get_document(owner_id, id).await?;
        if !self.repository.hard_delete(owner_id, id).await? {
            return Err(document_not_found());
        }

        match self
            .storage
            .delete(&document.storage_path, &owner_key(owner_id))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    storage_path = %document.storage_path,
                    "Stored file was already gone"
                )
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    storage_path = %document.storage_path,
                    "Failed to remove stored file"
                )
            }
        }

        audit::log_document_deleted(owner_id, id, &document.filename, true);
        Ok(())
    }

    /// Returns the record with the plaintext content and counts the download.
    #[tracing::instrument(skip(self), fields(owner_id = %owner_id, document_id = %id))]
    pub async fn get_document_content(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<(Document, Vec<u8>), AppError> {
        let document = self.get_document(owner_id, id).await?;
        if !document.is_ready() {
            return Err(AppError::InvalidInput(format!(
                "Document is not ready (status: {})",
                document.status
            )));
        }

        let content = self
            .storage
            .retrieve(&document.storage_path, &owner_key(owner_id))
            .await
            .map_err(storage_error)?;

        if let Err(e) = self.repository.record_download(owner_id, id).await {
            tracing::warn!(error = %e, "Failed to record download");
        }
        audit::log_document_downloaded(owner_id, id, content.len());

        Ok((document, content))
    }

    pub async fn verify_document_integrity(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<bool, AppError> {
        let document = self.get_document(owner_id, id).await?;
        let intact = self
            .storage
            .verify_integrity(
                &document.storage_path,
                &document.file_hash,
                &owner_key(owner_id),
            )
            .await;

        if !intact {
            tracing::warn!(
                document_id = %id,
                storage_path = %document.storage_path,
                "Integrity check failed"
            );
            audit::log_integrity_failure(owner_id, id);
        }
        Ok(intact)
    }

    pub async fn storage_stats(&self, owner_id: Uuid) -> Result<StorageUsage, AppError> {
        let stats = self.repository.stats(owner_id).await?;
        let limit = (self.config.max_file_size_bytes as i64)
            .saturating_mul(self.config.max_files_per_user);

        Ok(StorageUsage {
            document_count: stats.document_count,
            total_size_bytes: stats.total_size_bytes,
            total_size_human: format_size(stats.total_size_bytes.max(0) as u64),
            ready_count: stats.ready_count,
            processing_count: stats.processing_count,
            error_count: stats.error_count,
            storage_limit_bytes: limit,
            storage_limit_human: format_size(limit.max(0) as u64),
        })
    }
}

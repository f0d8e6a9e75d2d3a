use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use docvault_core::models::{Document, DocumentQuery, DocumentStats, DocumentStatus, DocumentUpdate};
use docvault_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::document::DocumentRepositoryTrait;

/// Process-local document repository.
///
/// Used when no database is configured and in tests. Contents are lost when the process exits.
#[derive(Clone, Default)]
pub struct InMemoryDocumentRepository {
    documents: Arc<RwLock<HashMap<Uuid, Document>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn visible_to(document: &Document, owner_id: Uuid) -> bool {
    document.owner_id == owner_id && !document.is_deleted()
}

fn matches_query(document: &Document, query: &DocumentQuery) -> bool {
    if query.status.is_some_and(|s| document.status != s) {
        return false;
    }
    if query.file_type.is_some_and(|t| document.file_type != t) {
        return false;
    }
    match query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            document.title.to_lowercase().contains(&term)
                || document.filename.to_lowercase().contains(&term)
                || document
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&term))
        }
    }
}

#[async_trait]
impl DocumentRepositoryTrait for InMemoryDocumentRepository {
    async fn insert(&self, document: &Document) -> Result<Document, AppError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&document.id) {
            return Err(AppError::InvalidInput(format!(
                "Document {} already exists",
                document.id
            )));
        }
        if documents
            .values()
            .any(|d| d.storage_path == document.storage_path)
        {
            return Err(AppError::InvalidInput(
                "Storage path already in use".to_string(),
            ));
        }
        documents.insert(document.id, document.clone());
        Ok(document.clone())
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Document>, AppError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&id)
            .filter(|d| visible_to(d, owner_id))
            .cloned())
    }

    async fn list(
        &self,
        owner_id: Uuid,
        query: &DocumentQuery,
    ) -> Result<(Vec<Document>, i64), AppError> {
        let documents = self.documents.read().await;
        let mut matching: Vec<&Document> = documents
            .values()
            .filter(|d| visible_to(d, owner_id) && matches_query(d, query))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn count_active(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let documents = self.documents.read().await;
        Ok(documents
            .values()
            .filter(|d| visible_to(d, owner_id))
            .count() as i64)
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: &DocumentUpdate,
    ) -> Result<Option<Document>, AppError> {
        let mut documents = self.documents.write().await;
        let Some(document) = documents.get_mut(&id).filter(|d| visible_to(d, owner_id)) else {
            return Ok(None);
        };

        if let Some(title) = &update.title {
            document.title = title.clone();
        }
        if let Some(description) = &update.description {
            document.description = Some(description.clone());
        }
        if let Some(is_sensitive) = update.is_sensitive {
            document.is_sensitive = is_sensitive;
        }
        document.updated_at = Utc::now();

        Ok(Some(document.clone()))
    }

    async fn mark_deleted(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(&id).filter(|d| visible_to(d, owner_id)) {
            Some(document) => {
                document.status = DocumentStatus::Deleted;
                document.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn hard_delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut documents = self.documents.write().await;
        if documents.get(&id).is_some_and(|d| d.owner_id == owner_id) {
            documents.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn record_download(&self, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut documents = self.documents.write().await;
        if let Some(document) = documents.get_mut(&id).filter(|d| d.owner_id == owner_id) {
            document.download_count += 1;
            document.last_accessed = Some(Utc::now());
        }
        Ok(())
    }

    async fn stats(&self, owner_id: Uuid) -> Result<DocumentStats, AppError> {
        let documents = self.documents.read().await;
        let mut stats = DocumentStats::default();
        for document in documents.values().filter(|d| visible_to(d, owner_id)) {
            stats.document_count += 1;
            stats.total_size_bytes += document.file_size;
            match document.status {
                DocumentStatus::Ready => stats.ready_count += 1,
                DocumentStatus::Processing => stats.processing_count += 1,
                DocumentStatus::Error => stats.error_count += 1,
                DocumentStatus::Uploading | DocumentStatus::Deleted => {}
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use docvault_core::models::DocumentType;

    fn document(owner_id: Uuid, title: &str, minutes_ago: i64) -> Document {
        let created_at = Utc::now() - Duration::minutes(minutes_ago);
        let id = Uuid::new_v4();
        Document {
            id,
            owner_id,
            filename: format!("{}.txt", title.to_lowercase()),
            title: title.to_string(),
            description: None,
            file_size: 100,
            file_type: DocumentType::Text,
            mime_type: "text/plain".to_string(),
            file_hash: "0".repeat(64),
            storage_path: format!("{}/2026/10/{}.txt", &owner_id.to_string()[..8], id),
            status: DocumentStatus::Ready,
            is_encrypted: true,
            is_sensitive: false,
            view_count: 0,
            download_count: 0,
            last_accessed: None,
            created_at,
            updated_at: created_at,
            processing_completed_at: Some(created_at),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_is_owner_scoped() {
        let repo = InMemoryDocumentRepository::new();
        let owner = Uuid::new_v4();
        let doc = repo.insert(&document(owner, "Budget", 0)).await.unwrap();

        assert_eq!(repo.get(owner, doc.id).await.unwrap(), Some(doc.clone()));
        assert_eq!(repo.get(Uuid::new_v4(), doc.id).await.unwrap(), None);
        assert!(repo.insert(&doc).await.is_err());
    }

    #[tokio::test]
    async fn test_list_orders_filters_and_pages() {
        let repo = InMemoryDocumentRepository::new();
        let owner = Uuid::new_v4();
        let oldest = repo.insert(&document(owner, "Alpha", 30)).await.unwrap();
        let middle = repo.insert(&document(owner, "Beta", 20)).await.unwrap();
        let newest = repo.insert(&document(owner, "Gamma", 10)).await.unwrap();
        repo.insert(&document(Uuid::new_v4(), "Foreign", 0)).await.unwrap();

        let (all, total) = repo.list(owner, &DocumentQuery::default()).await.unwrap();
        assert_eq!(total, 3);
        let ids: Vec<Uuid> = all.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);

        let page = DocumentQuery {
            offset: 1,
            limit: 1,
            ..DocumentQuery::default()
        };
        let (docs, total) = repo.list(owner, &page).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, middle.id);

        let search = DocumentQuery {
            search: Some("GAM".to_string()),
            ..DocumentQuery::default()
        };
        let (docs, total) = repo.list(owner, &search).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(docs[0].id, newest.id);

        let by_type = DocumentQuery {
            file_type: Some(DocumentType::Pdf),
            ..DocumentQuery::default()
        };
        assert_eq!(repo.list(owner, &by_type).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn test_update_only_touches_given_fields() {
        let repo = InMemoryDocumentRepository::new();
        let owner = Uuid::new_v4();
        let doc = repo.insert(&document(owner, "Draft", 5)).await.unwrap();

        let updated = repo
            .update(
                owner,
                doc.id,
                &DocumentUpdate {
                    description: Some("second pass".to_string()),
                    ..DocumentUpdate::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Draft");
        assert_eq!(updated.description.as_deref(), Some("second pass"));
        assert!(updated.updated_at > doc.updated_at);

        assert!(repo
            .update(Uuid::new_v4(), doc.id, &DocumentUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_document() {
        let repo = InMemoryDocumentRepository::new();
        let owner = Uuid::new_v4();
        let doc = repo.insert(&document(owner, "Old", 5)).await.unwrap();

        assert!(repo.mark_deleted(owner, doc.id).await.unwrap());
        assert!(!repo.mark_deleted(owner, doc.id).await.unwrap());
        assert_eq!(repo.get(owner, doc.id).await.unwrap(), None);
        assert_eq!(repo.count_active(owner).await.unwrap(), 0);
        assert_eq!(repo.list(owner, &DocumentQuery::default()).await.unwrap().1, 0);

        // Hard delete still removes the soft-deleted row.
        assert!(repo.hard_delete(owner, doc.id).await.unwrap());
        assert!(!repo.hard_delete(owner, doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_download_and_stats() {
        let repo = InMemoryDocumentRepository::new();
        let owner = Uuid::new_v4();
        let doc = repo.insert(&document(owner, "Report", 5)).await.unwrap();
        let mut failed = document(owner, "Broken", 1);
        failed.status = DocumentStatus::Error;
        repo.insert(&failed).await.unwrap();

        repo.record_download(owner, doc.id).await.unwrap();
        repo.record_download(owner, doc.id).await.unwrap();
        let fetched = repo.get(owner, doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.download_count, 2);
        assert!(fetched.last_accessed.is_some());

        let stats = repo.stats(owner).await.unwrap();
        assert_eq!(
            stats,
            DocumentStats {
                document_count: 2,
                total_size_bytes: 200,
                ready_count: 1,
                processing_count: 0,
                error_count: 1,
            }
        );
    }
}

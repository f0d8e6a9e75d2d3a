use async_trait::async_trait;
use chrono::Utc;
use docvault_core::models::{Document, DocumentQuery, DocumentStats, DocumentStatus, DocumentUpdate};
use docvault_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "id, owner_id, filename, title, description, file_size, file_type, \
    mime_type, file_hash, storage_path, status, is_encrypted, is_sensitive, view_count, \
    download_count, last_accessed, created_at, updated_at, processing_completed_at";

/// Document metadata store
///
/// Every lookup is scoped by owner. Soft-deleted documents are invisible to
/// `get`, `list`, `update` and the statistics; only `hard_delete` still sees them.
#[async_trait]
pub trait DocumentRepositoryTrait: Send + Sync {
    async fn insert(&self, document: &Document) -> Result<Document, AppError>;

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Document>, AppError>;

    /// One page of documents, newest first, with the total number of matches.
    async fn list(
        &self,
        owner_id: Uuid,
        query: &DocumentQuery,
    ) -> Result<(Vec<Document>, i64), AppError>;

    /// Number of documents counted against the owner's quota.
    async fn count_active(&self, owner_id: Uuid) -> Result<i64, AppError>;

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: &DocumentUpdate,
    ) -> Result<Option<Document>, AppError>;

    async fn mark_deleted(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    async fn hard_delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    async fn record_download(&self, owner_id: Uuid, id: Uuid) -> Result<(), AppError>;

    async fn stats(&self, owner_id: Uuid) -> Result<DocumentStats, AppError>;
}

/// PostgreSQL-backed document repository
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{}%", escaped)
        })
}

#[async_trait]
impl DocumentRepositoryTrait for PgDocumentRepository {
    #[tracing::instrument(skip(self, document), fields(db.table = "documents", db.operation = "insert", db.record_id = %document.id))]
    async fn insert(&self, document: &Document) -> Result<Document, AppError> {
        let sql = format!(
            r#"
            INSERT INTO documents ({DOCUMENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<Postgres, Document>(&sql)
            .bind(document.id)
            .bind(document.owner_id)
            .bind(&document.filename)
            .bind(&document.title)
            .bind(&document.description)
            .bind(document.file_size)
            .bind(document.file_type)
            .bind(&document.mime_type)
            .bind(&document.file_hash)
            .bind(&document.storage_path)
            .bind(document.status)
            .bind(document.is_encrypted)
            .bind(document.is_sensitive)
            .bind(document.view_count)
            .bind(document.download_count)
            .bind(document.last_accessed)
            .bind(document.created_at)
            .bind(document.updated_at)
            .bind(document.processing_completed_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(inserted)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Document>, AppError> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1 AND owner_id = $2 AND status <> 'deleted'"
        );

        let document = sqlx::query_as::<Postgres, Document>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn list(
        &self,
        owner_id: Uuid,
        query: &DocumentQuery,
    ) -> Result<(Vec<Document>, i64), AppError> {
        let pattern = search_pattern(query.search.as_deref());
        let filter = r#"
            owner_id = $1
            AND status <> 'deleted'
            AND ($2::document_status IS NULL OR status = $2)
            AND ($3::document_type IS NULL OR file_type = $3)
            AND ($4::text IS NULL OR title ILIKE $4 OR description ILIKE $4 OR filename ILIKE $4)
        "#;

        let total = sqlx::query_scalar::<Postgres, i64>(&format!(
            "SELECT COUNT(*) FROM documents WHERE {filter}"
        ))
        .bind(owner_id)
        .bind(query.status)
        .bind(query.file_type)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let documents = sqlx::query_as::<Postgres, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE {filter} ORDER BY created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(owner_id)
        .bind(query.status)
        .bind(query.file_type)
        .bind(&pattern)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((documents, total))
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn count_active(&self, owner_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM documents WHERE owner_id = $1 AND status <> 'deleted'",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: &DocumentUpdate,
    ) -> Result<Option<Document>, AppError> {
        let sql = format!(
            r#"
            UPDATE documents
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                is_sensitive = COALESCE($5, is_sensitive),
                updated_at = $6
            WHERE id = $1 AND owner_id = $2 AND status <> 'deleted'
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );

        let document = sqlx::query_as::<Postgres, Document>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&update.title)
            .bind(&update.description)
            .bind(update.is_sensitive)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    async fn mark_deleted(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE documents SET status = $3, updated_at = $4 WHERE id = $1 AND owner_id = $2 AND status <> 'deleted'",
        )
        .bind(id)
        .bind(owner_id)
        .bind(DocumentStatus::Deleted)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete", db.record_id = %id))]
    async fn hard_delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    async fn record_download(&self, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE documents SET download_count = download_count + 1, last_accessed = $3 WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn stats(&self, owner_id: Uuid) -> Result<DocumentStats, AppError> {
        let stats = sqlx::query_as::<Postgres, DocumentStats>(
            r#"
            SELECT
                COUNT(*) AS document_count,
                COALESCE(SUM(file_size), 0)::BIGINT AS total_size_bytes,
                COUNT(*) FILTER (WHERE status = 'ready') AS ready_count,
                COUNT(*) FILTER (WHERE status = 'processing') AS processing_count,
                COUNT(*) FILTER (WHERE status = 'error') AS error_count
            FROM documents
            WHERE owner_id = $1 AND status <> 'deleted'
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(Some("report")), Some("%report%".to_string()));
        assert_eq!(
            search_pattern(Some("100%_done")),
            Some("%100\\%\\_done%".to_string())
        );
    }
}

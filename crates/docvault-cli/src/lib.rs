use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use docvault_core::models::{DocumentQuery, DocumentStatus, DocumentType};
use docvault_core::{AppError, Config, ErrorMetadata, LogLevel};
use docvault_db::{setup_database, DocumentRepositoryTrait, PgDocumentRepository};
use docvault_services::{DocumentService, InMemoryDocumentRepository, SecureStorage};

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Explicitly constructed components shared by all subcommands.
pub struct App {
    pub storage: Arc<SecureStorage>,
    pub service: DocumentService,
}

impl App {
    /// Records go to PostgreSQL when `DATABASE_URL` is set, otherwise to a
    /// store that lives as long as this process.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let storage = Arc::new(
            SecureStorage::new(config.storage_root.clone(), config.encryption_key.as_deref())
                .await
                .context("Failed to initialize secure storage")?,
        );

        let repository: Arc<dyn DocumentRepositoryTrait> = if config.database_url.is_some() {
            let pool = setup_database(&config).await?;
            Arc::new(PgDocumentRepository::new(pool))
        } else {
            tracing::info!("DATABASE_URL not set, document records are kept in memory");
            Arc::new(InMemoryDocumentRepository::new())
        };

        let service = DocumentService::new(config, storage.clone(), repository);
        Ok(Self { storage, service })
    }
}

/// Filters for listing an owner's documents.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Owner UUID
    #[arg(long)]
    pub owner: uuid::Uuid,
    /// uploading, processing, ready, error or deleted
    #[arg(long)]
    pub status: Option<DocumentStatus>,
    /// pdf, word, excel, powerpoint, text, csv, json or other
    #[arg(long = "type")]
    pub file_type: Option<DocumentType>,
    /// Substring matched against title, description and filename
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long, default_value_t = 100)]
    pub limit: i64,
    #[arg(long, default_value_t = 0)]
    pub offset: i64,
}

impl ListArgs {
    pub fn query(&self) -> DocumentQuery {
        DocumentQuery {
            status: self.status,
            file_type: self.file_type,
            search: self.search.clone(),
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// JSON error body for a failed command, logged at the error's level.
///
/// Sensitive details are replaced by the client message in production.
pub fn error_report(err: &AppError, production: bool) -> serde_json::Value {
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %err, code = err.error_code(), "Command rejected")
        }
        LogLevel::Warn => {
            tracing::warn!(error = %err, code = err.error_code(), "Command rejected")
        }
        LogLevel::Error => tracing::error!(
            error = %err.detailed_message(),
            code = err.error_code(),
            "Command failed"
        ),
    }

    let details = if production && err.is_sensitive() {
        None
    } else {
        Some(err.detailed_message())
    };

    serde_json::json!({
        "error": err.client_message(),
        "code": err.error_code(),
        "recoverable": err.is_recoverable(),
        "suggested_action": err.suggested_action(),
        "details": details,
    })
}

/// Read a local file, returning its name and content.
pub async fn read_input(path: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?
        .to_string();
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok((filename, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_core::models::NewDocument;
    use docvault_services::DocumentStorage;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_build_without_database_uses_memory_store() {
        let dir = tempdir().unwrap();
        let app = App::build(Config::with_storage_root(dir.path().join("vault")))
            .await
            .unwrap();

        let owner = Uuid::new_v4();
        let doc = app
            .service
            .create_document(owner, b"hello".to_vec(), "hello.txt", NewDocument::default())
            .await
            .unwrap();
        assert_eq!(app.service.get_document(owner, doc.id).await.unwrap().id, doc.id);
        assert_eq!(app.storage.stats().await.unwrap().file_count, 1);
        assert!(dir.path().join("vault/.encryption_key").exists());
    }

    #[test]
    fn test_error_report_hides_sensitive_details_in_production() {
        let err = AppError::Storage("disk /var/vault unreadable".to_string());

        let report = error_report(&err, true);
        assert_eq!(report["code"], "STORAGE_ERROR");
        assert_eq!(report["error"], "Failed to access storage");
        assert!(report["details"].is_null());

        let report = error_report(&err, false);
        assert!(report["details"].as_str().unwrap().contains("/var/vault"));
    }

    #[test]
    fn test_error_report_for_client_errors() {
        let err = AppError::NotFound("Document not found".to_string());
        let report = error_report(&err, true);
        assert_eq!(report["code"], "NOT_FOUND");
        assert_eq!(report["error"], "Document not found");
        assert_eq!(report["recoverable"], false);
        assert!(report["details"].is_string());
    }

    #[test]
    fn test_error_report_wraps_unexpected_failures() {
        let err = AppError::from(anyhow::anyhow!("pool timed out").context("Failed to connect"));
        assert_eq!(err.exit_code(), 70);

        let report = error_report(&err, true);
        assert_eq!(report["code"], "INTERNAL_ERROR");
        assert_eq!(report["error"], "Internal error");
        assert!(report["details"].is_null());

        let report = error_report(&err, false);
        assert!(report["details"].as_str().unwrap().contains("pool timed out"));
    }

    #[derive(clap::Parser)]
    struct ListCommand {
        #[command(flatten)]
        args: ListArgs,
    }

    #[test]
    fn test_list_args_parse_filters() {
        use clap::Parser;

        let owner = Uuid::new_v4().to_string();
        let cmd = ListCommand::try_parse_from([
            "list", "--owner", owner.as_str(), "--status", "Ready", "--type", "csv", "--limit", "5",
        ])
        .unwrap();
        let query = cmd.args.query();
        assert_eq!(query.status, Some(DocumentStatus::Ready));
        assert_eq!(query.file_type, Some(DocumentType::Csv));
        assert_eq!(query.limit, 5);
        assert_eq!(query.offset, 0);

        let args = ["list", "--owner", owner.as_str(), "--status", "gone"];
        let err = ListCommand::try_parse_from(args).err().unwrap();
        assert!(err.to_string().contains("Unknown document status: gone"));
    }

    #[tokio::test]
    async fn test_list_query_applies_filters() {
        let dir = tempdir().unwrap();
        let app = App::build(Config::with_storage_root(dir.path())).await.unwrap();
        let owner = Uuid::new_v4();
        let sheet = app
            .service
            .create_document(owner, b"a,b\n1,2\n".to_vec(), "sheet.csv", NewDocument::default())
            .await
            .unwrap();
        app.service
            .create_document(owner, b"hello".to_vec(), "notes.txt", NewDocument::default())
            .await
            .unwrap();

        let mut args = ListArgs {
            owner,
            status: None,
            file_type: Some(DocumentType::Csv),
            search: None,
            limit: 100,
            offset: 0,
        };
        let page = app.service.list_documents(owner, args.query()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.documents[0].id, sheet.id);

        args.file_type = None;
        args.status = Some(DocumentStatus::Error);
        let page = app.service.list_documents(owner, args.query()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_read_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"abc").unwrap();

        let (name, content) = read_input(&path).await.unwrap();
        assert_eq!(name, "notes.txt");
        assert_eq!(content, b"abc");

        assert!(read_input(&dir.path().join("missing.txt")).await.is_err());
    }
}

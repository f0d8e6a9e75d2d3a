//! Configuration module
//!
//! Settings for document validation, secure storage and the optional
//! metadata database, loaded from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;

use crate::constants::DEFAULT_ALLOWED_FILE_TYPES;

// Common constants
const MAX_FILE_SIZE_MB: usize = 10;
const MAX_FILES_PER_USER: i64 = 100;
const MAX_BATCH_FILES: usize = 10;
const MAX_BATCH_SIZE_MB: usize = 50;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    pub environment: String,
    pub storage_root: PathBuf,
    pub max_file_size_bytes: usize,
    pub allowed_file_types: Vec<String>,
    pub enable_file_encryption: bool,
    /// Base64 key that takes precedence over the key file under the storage root.
    pub encryption_key: Option<String>,
    pub max_files_per_user: i64,
    pub max_batch_files: usize,
    pub max_batch_size_bytes: usize,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("storage_root", &self.storage_root)
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .field("allowed_file_types", &self.allowed_file_types)
            .field("enable_file_encryption", &self.enable_file_encryption)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .field("max_files_per_user", &self.max_files_per_user)
            .field("max_batch_files", &self.max_batch_files)
            .field("max_batch_size_bytes", &self.max_batch_size_bytes)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_timeout_seconds", &self.db_timeout_seconds)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: "development".to_string(),
            storage_root: PathBuf::from("./storage"),
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_file_types: DEFAULT_ALLOWED_FILE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            enable_file_encryption: true,
            encryption_key: None,
            max_files_per_user: MAX_FILES_PER_USER,
            max_batch_files: MAX_BATCH_FILES,
            max_batch_size_bytes: MAX_BATCH_SIZE_MB * 1024 * 1024,
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Default settings rooted at `root`.
    pub fn with_storage_root(root: impl Into<PathBuf>) -> Self {
        Config {
            storage_root: root.into(),
            ..Config::default()
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let allowed_file_types = env::var("ALLOWED_FILE_TYPES")
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.allowed_file_types);

        let config = Config {
            environment,
            storage_root: env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_file_types,
            enable_file_encryption: env::var("ENABLE_FILE_ENCRYPTION")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            encryption_key: env::var("DOCVAULT_ENCRYPTION_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            max_files_per_user: env::var("MAX_FILES_PER_USER")
                .unwrap_or_else(|_| MAX_FILES_PER_USER.to_string())
                .parse()
                .unwrap_or(MAX_FILES_PER_USER),
            max_batch_files: env::var("MAX_BATCH_FILES")
                .unwrap_or_else(|_| MAX_BATCH_FILES.to_string())
                .parse()
                .unwrap_or(MAX_BATCH_FILES),
            max_batch_size_bytes: env::var("MAX_BATCH_SIZE_MB")
                .unwrap_or_else(|_| MAX_BATCH_SIZE_MB.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_BATCH_SIZE_MB)
                * 1024
                * 1024,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than zero"));
        }

        if self.allowed_file_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_FILE_TYPES must list at least one MIME type"
            ));
        }

        if self.max_batch_files == 0 || self.max_batch_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_BATCH_FILES and MAX_BATCH_SIZE_MB must be greater than zero"
            ));
        }

        if self.storage_root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("STORAGE_ROOT must not be empty"));
        }

        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgresql://") || url.starts_with("postgres://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        Ok(())
    }
}

//! Docvault Core Library
//!
//! This crate provides the domain models, error types, configuration, encryption
//! and upload validation shared across all Docvault components.

pub mod config;
pub mod constants;
pub mod encryption;
pub mod error;
pub mod format;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use encryption::{EncryptionService, KEY_LEN};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use format::{format_size, sha256_hex};
pub use validation::{safe_filename, FileAnalysis, FileValidator, RiskLevel, ValidationError};

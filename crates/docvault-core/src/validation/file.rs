use std::collections::HashSet;
use std::sync::LazyLock;

use regex::bytes::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::constants::{
    DANGEROUS_EXTENSIONS, FORBIDDEN_FILENAME_SEQUENCES, LINE_SCAN_LIMIT, MAX_FILENAME_LENGTH,
    MAX_LINE_LENGTH, MAX_NULL_BYTE_PERCENT, SUSPICIOUS_PATTERNS, UNKNOWN_FILENAME,
};
use crate::format::{format_megabytes, sha256_hex};

use super::mime::detect_mime_type;

static SUSPICIOUS_CONTENT: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSetBuilder::new(SUSPICIOUS_PATTERNS.iter().map(|p| regex::escape(p)))
        .case_insensitive(true)
        .unicode(false)
        .build()
        .expect("escaped literal patterns always compile")
});

/// Reasons an upload is rejected. All of them are client-caused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File is empty")]
    Empty,

    #[error(
        "File too large: {} (max: {})",
        format_megabytes(*actual),
        format_megabytes(*limit)
    )]
    TooLarge { actual: usize, limit: usize },

    #[error("File must have a filename")]
    MissingFilename,

    #[error("Filename contains forbidden character sequence {0:?}")]
    UnsafeFilename(String),

    #[error("Filename too long: {length} characters (max: {max})")]
    FilenameTooLong { length: usize, max: usize },

    #[error("File extension '{0}' is not allowed")]
    DangerousExtension(String),

    #[error("Filename contains a hidden executable extension '{0}'")]
    DoubleExtension(String),

    #[error("File type '{0}' is not allowed")]
    DisallowedType(String),

    #[error("File contains potentially malicious content")]
    SuspiciousContent,

    #[error("File contains too many null bytes")]
    ExcessiveNullBytes,

    #[error("File contains unusually long lines")]
    LongLines,
}

/// Metadata describing an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Sanitized filename.
    pub filename: String,
    pub size: usize,
    /// MIME type detected from the content, never the client-supplied one.
    pub mime_type: String,
    /// Hex SHA-256 of the content.
    pub content_hash: String,
    pub is_safe: bool,
}

/// Stateless gatekeeper for upload bytes and their claimed filename.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: usize,
    allowed_mime_types: HashSet<String>,
}

impl FileValidator {
    pub fn new<I, S>(max_file_size: usize, allowed_mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            max_file_size,
            allowed_mime_types: allowed_mime_types
                .into_iter()
                .map(|m| m.into().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_file_size_bytes,
            config.allowed_file_types.iter().cloned(),
        )
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Accepted MIME types, sorted.
    pub fn allowed_mime_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.allowed_mime_types.iter().cloned().collect();
        types.sort();
        types
    }

    pub fn is_allowed_type(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.contains(&mime_type.to_lowercase())
    }

    /// Run every check in order; the first violation is returned.
    pub fn validate(
        &self,
        content: &[u8],
        filename: &str,
    ) -> Result<ValidationResult, ValidationError> {
        if content.is_empty() {
            return Err(ValidationError::Empty);
        }

        if content.len() > self.max_file_size {
            return Err(ValidationError::TooLarge {
                actual: content.len(),
                limit: self.max_file_size,
            });
        }

        check_filename(filename)?;
        check_extensions(filename)?;

        let mime_type = detect_mime_type(content, filename);
        if !self.is_allowed_type(&mime_type) {
            tracing::debug!(
                filename = %filename,
                mime_type = %mime_type,
                "Rejected upload with disallowed MIME type"
            );
            return Err(ValidationError::DisallowedType(mime_type));
        }

        check_content(content)?;

        Ok(ValidationResult {
            filename: safe_filename(filename),
            size: content.len(),
            mime_type,
            content_hash: sha256_hex(content),
            is_safe: true,
        })
    }
}

fn check_filename(filename: &str) -> Result<(), ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError::MissingFilename);
    }

    if let Some(sequence) = FORBIDDEN_FILENAME_SEQUENCES
        .iter()
        .find(|s| filename.contains(**s))
    {
        return Err(ValidationError::UnsafeFilename(sequence.to_string()));
    }

    let length = filename.chars().count();
    if length > MAX_FILENAME_LENGTH {
        return Err(ValidationError::FilenameTooLong {
            length,
            max: MAX_FILENAME_LENGTH,
        });
    }

    Ok(())
}

fn check_extensions(filename: &str) -> Result<(), ValidationError> {
    let lower = filename.to_lowercase();
    let parts: Vec<&str> = lower.split('.').collect();
    if parts.len() < 2 {
        return Ok(());
    }

    let last = format!(".{}", parts[parts.len() - 1]);
    if DANGEROUS_EXTENSIONS.contains(&last.as_str()) {
        return Err(ValidationError::DangerousExtension(last));
    }

    // Interior segments: `invoice.exe.pdf` smuggles an executable extension.
    for part in &parts[1..parts.len() - 1] {
        let interior = format!(".{}", part);
        if DANGEROUS_EXTENSIONS.contains(&interior.as_str()) {
            return Err(ValidationError::DoubleExtension(interior));
        }
    }

    Ok(())
}

/// Suspicious patterns found anywhere in `content`, in declaration order.
pub(super) fn suspicious_patterns(content: &[u8]) -> Vec<&'static str> {
    SUSPICIOUS_CONTENT
        .matches(content)
        .iter()
        .map(|i| SUSPICIOUS_PATTERNS[i])
        .collect()
}

fn check_content(content: &[u8]) -> Result<(), ValidationError> {
    if SUSPICIOUS_CONTENT.is_match(content) {
        tracing::warn!(
            patterns = ?suspicious_patterns(content),
            "Suspicious content detected in upload"
        );
        return Err(ValidationError::SuspiciousContent);
    }

    let null_count = content.iter().filter(|b| **b == 0).count();
    if null_count * 100 > content.len() * MAX_NULL_BYTE_PERCENT {
        return Err(ValidationError::ExcessiveNullBytes);
    }

    if content
        .split(|b| *b == b'\n')
        .take(LINE_SCAN_LIMIT)
        .any(|line| line.len() > MAX_LINE_LENGTH)
    {
        return Err(ValidationError::LongLines);
    }

    Ok(())
}

/// Reduce an arbitrary filename to `[A-Za-z0-9.\- _]`.
///
/// Never fails: a name that sanitizes to nothing becomes `unknown_file`.
pub fn safe_filename(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if matches!(c, '.' | ' ') && collapsed.ends_with(c) {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        UNKNOWN_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

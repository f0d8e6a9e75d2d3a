use serde::{Deserialize, Serialize};

use crate::format::sha256_hex;

use super::file::{safe_filename, suspicious_patterns, FileValidator, ValidationError};
use super::mime::detect_mime_type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Byte-level statistics over the whole content, not just the scan window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentProfile {
    pub size: usize,
    pub has_null_bytes: bool,
    pub null_byte_percentage: f64,
    pub line_count: usize,
    pub max_line_length: usize,
}

/// Security report for a single file. Produced even when validation fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub sanitized_filename: String,
    pub detected_mime_type: String,
    pub content_hash: String,
    pub content: ContentProfile,
    pub suspicious_patterns: Vec<String>,
    pub is_valid: bool,
    pub validation_error: Option<String>,
    pub risk_level: RiskLevel,
}

impl ContentProfile {
    pub fn of(content: &[u8]) -> Self {
        if content.is_empty() {
            return Self {
                size: 0,
                has_null_bytes: false,
                null_byte_percentage: 0.0,
                line_count: 0,
                max_line_length: 0,
            };
        }

        let nulls = content.iter().filter(|b| **b == 0).count();
        let (line_count, max_line_length) = content
            .split(|b| *b == b'\n')
            .fold((0, 0), |(count, longest), line| (count + 1, longest.max(line.len())));

        Self {
            size: content.len(),
            has_null_bytes: nulls > 0,
            null_byte_percentage: nulls as f64 * 100.0 / content.len() as f64,
            line_count,
            max_line_length,
        }
    }
}

impl FileValidator {
    /// Inspect `content` without rejecting it.
    ///
    /// Runs the same checks as [`FileValidator::validate`] and reports the
    /// outcome alongside the raw statistics they are based on.
    pub fn analyze(&self, content: &[u8], filename: &str) -> FileAnalysis {
        let validation_error = self.validate(content, filename).err();
        let patterns = suspicious_patterns(content);
        let profile = ContentProfile::of(content);
        let risk_level = assess_risk(validation_error.as_ref(), &patterns, &profile);

        tracing::debug!(
            filename = %filename,
            risk_level = ?risk_level,
            valid = validation_error.is_none(),
            "File analyzed"
        );

        FileAnalysis {
            filename: filename.to_string(),
            sanitized_filename: safe_filename(filename),
            detected_mime_type: detect_mime_type(content, filename),
            content_hash: sha256_hex(content),
            content: profile,
            suspicious_patterns: patterns.into_iter().map(String::from).collect(),
            is_valid: validation_error.is_none(),
            validation_error: validation_error.map(|e| e.to_string()),
            risk_level,
        }
    }
}

fn assess_risk(
    error: Option<&ValidationError>,
    patterns: &[&str],
    profile: &ContentProfile,
) -> RiskLevel {
    let hostile = matches!(
        error,
        Some(
            ValidationError::SuspiciousContent
                | ValidationError::DangerousExtension(_)
                | ValidationError::DoubleExtension(_)
                | ValidationError::UnsafeFilename(_)
        )
    );

    if hostile || !patterns.is_empty() {
        RiskLevel::High
    } else if error.is_some() || profile.has_null_bytes {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

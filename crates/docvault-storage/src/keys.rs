//! Storage path generation and parsing.
//!
//! Path format (relative to `{root}/documents`): `{owner_prefix}/{yyyy}/{mm}/{uuid}{ext}`.
//! Nothing from the uploaded filename ends up in the path except a sanitized extension.

use std::path::{Component, Path};

use chrono::{DateTime, Datelike, Utc};
use docvault_core::constants::{MAX_STORED_EXTENSION_LENGTH, OWNER_PREFIX_LENGTH};
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// First eight characters of the owner id.
pub fn owner_prefix(owner_id: &str) -> String {
    owner_id.chars().take(OWNER_PREFIX_LENGTH).collect()
}

/// Lowercased extension of `filename`, dot included, capped in length.
///
/// Non-alphanumeric characters are dropped so the extension cannot carry path syntax.
pub fn stored_extension(filename: &str) -> String {
    let ext: String = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_STORED_EXTENSION_LENGTH - 1)
        .collect();

    if ext.is_empty() {
        String::new()
    } else {
        format!(".{}", ext)
    }
}

/// Owner prefix, checked to be usable as a single path component.
pub fn checked_owner_prefix(owner_id: &str) -> StorageResult<String> {
    let prefix = owner_prefix(owner_id);
    if prefix.is_empty()
        || !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::InvalidPath(
            "Owner id must start with alphanumeric characters".to_string(),
        ));
    }
    Ok(prefix)
}

pub fn generate_storage_path(
    owner_id: &str,
    original_filename: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "{}/{:04}/{:02}/{}{}",
        owner_prefix(owner_id),
        now.year(),
        now.month(),
        Uuid::new_v4(),
        stored_extension(original_filename)
    )
}

/// Reject anything that is not a plain relative path of normal components.
pub fn validate_relative_path(path: &str) -> StorageResult<()> {
    if path.is_empty()
        || path.contains("..")
        || path.contains('\\')
        || path.contains('\0')
        || path.starts_with('/')
    {
        return Err(StorageError::InvalidPath(
            "Storage path contains invalid characters".to_string(),
        ));
    }

    if !Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(StorageError::InvalidPath(
            "Storage path must be relative".to_string(),
        ));
    }

    Ok(())
}

/// Whether `path` sits under the caller's owner prefix.
///
/// Coarse structural gate, not an authorization decision.
pub fn is_owned_by(path: &str, owner_id: &str) -> bool {
    let prefix = owner_prefix(owner_id);
    !prefix.is_empty() && path.split('/').next() == Some(prefix.as_str())
}

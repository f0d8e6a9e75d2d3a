//! Docvault Storage Library
//!
//! Encrypted, owner-scoped persistence of accepted document content.
//!
//! # Layout
//!
//! ```text
//! {root}/.encryption_key                      32 raw key bytes, mode 0600
//! {root}/documents/{owner}/{yyyy}/{mm}/{uuid}{ext}
//! {root}/temp/                                in-flight writes
//! {root}/previews/
//! {root}/chunks/
//! ```
//!
//! Storage paths handed to callers are relative to `{root}/documents` and
//! start with the first eight characters of the owner id. The only access
//! control here is a structural check of that prefix. Anyone who knows a
//! path and the prefix format can pass it, so it must sit behind a real
//! authorization layer.

pub mod factory;
pub(crate) mod key_store;
pub(crate) mod keys;
pub mod secure;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use secure::SecureStorage;
pub use traits::{DocumentStorage, StorageError, StorageResult};

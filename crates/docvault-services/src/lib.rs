//! Docvault Services Layer
//!
//! Orchestrates validation, secure storage and the metadata repository behind
//! a single `DocumentService`. Callers construct the storage backend and the
//! repository themselves and inject them; nothing here holds global state.

pub mod audit;
pub mod document;

pub use docvault_db::{DocumentRepositoryTrait, InMemoryDocumentRepository};
pub use docvault_storage::{create_storage, DocumentStorage, SecureStorage, StorageError};
pub use document::{owner_key, storage_error, DocumentService};

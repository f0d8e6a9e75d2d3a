//! Database repositories for data access layer

pub mod document;
pub mod memory;
pub mod setup;

pub use document::{DocumentRepositoryTrait, PgDocumentRepository};
pub use memory::InMemoryDocumentRepository;
pub use setup::setup_database;

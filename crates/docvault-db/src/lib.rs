//! Docvault Database Layer
//!
//! Document metadata repositories: a PostgreSQL implementation for real
//! deployments and an in-memory one for tests and database-less runs.

pub mod db;

pub use db::{
    setup_database, DocumentRepositoryTrait, InMemoryDocumentRepository, PgDocumentRepository,
};

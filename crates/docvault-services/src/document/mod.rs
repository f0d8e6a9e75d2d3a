mod batch;
mod service;

pub use service::{owner_key, storage_error, DocumentService};

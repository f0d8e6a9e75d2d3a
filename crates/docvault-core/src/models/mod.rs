//! Data models shared by storage, persistence and the service layer.

mod batch;
mod document;
mod storage;

pub use batch::*;
pub use document::*;
pub use storage::*;

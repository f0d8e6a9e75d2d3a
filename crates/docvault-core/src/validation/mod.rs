//! Upload validation
//!
//! Everything that decides whether raw upload bytes may reach storage lives
//! here. Validation is pure inspection and never touches the filesystem.

mod analysis;
mod file;
mod mime;

pub use analysis::{ContentProfile, FileAnalysis, RiskLevel};
pub use file::{safe_filename, FileValidator, ValidationError, ValidationResult};
pub use mime::detect_mime_type;

use std::path::Path;

use crate::constants::OCTET_STREAM;

/// Detect the MIME type of `content`.
///
/// Binary signatures win. The filename extension is only consulted for
/// formats that carry no signature at all (plain text and friends), so a
/// file cannot claim to be a PDF or an Office document by its name alone.
pub fn detect_mime_type(content: &[u8], filename: &str) -> String {
    if let Some(kind) = infer::get(content) {
        return kind.mime_type().to_string();
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let guessed = match extension.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "md" | "markdown" => "text/markdown",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        _ => OCTET_STREAM,
    };

    tracing::debug!(
        filename = %filename,
        mime_type = %guessed,
        "No binary signature found, guessed MIME type from extension"
    );

    guessed.to_string()
}

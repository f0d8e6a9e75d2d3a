//! Constants shared by validation, storage and configuration.

/// Hard ceiling on filename length (characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Extension kept in storage paths is truncated to this many characters (dot included).
pub const MAX_STORED_EXTENSION_LENGTH: usize = 10;

/// Number of owner-id characters embedded in storage paths.
pub const OWNER_PREFIX_LENGTH: usize = 8;

/// Fallback MIME type when neither the signature nor the extension identifies the content.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Placeholder used when a filename sanitizes to nothing.
pub const UNKNOWN_FILENAME: &str = "unknown_file";

/// Name of the key file under the storage root.
pub const ENCRYPTION_KEY_FILE: &str = ".encryption_key";

/// Fixed sub-areas created under the storage root.
pub const DOCUMENTS_DIR: &str = "documents";
pub const TEMP_DIR: &str = "temp";
pub const PREVIEWS_DIR: &str = "previews";
pub const CHUNKS_DIR: &str = "chunks";
pub const STORAGE_SUBDIRS: [&str; 4] = [DOCUMENTS_DIR, TEMP_DIR, PREVIEWS_DIR, CHUNKS_DIR];

/// Characters that may never appear in an uploaded filename.
pub const FORBIDDEN_FILENAME_SEQUENCES: [&str; 11] =
    ["..", "/", "\\", ":", "*", "?", "\"", "<", ">", "|", "\0"];

/// Executable and script extensions rejected anywhere in a filename.
pub const DANGEROUS_EXTENSIONS: [&str; 24] = [
    ".exe", ".scr", ".bat", ".cmd", ".com", ".pif", ".vbs", ".vbe", ".js", ".jar", ".jsp", ".php",
    ".asp", ".aspx", ".ps1", ".ps2", ".msi", ".msp", ".mst", ".dll", ".cpl", ".inf", ".reg",
    ".sys",
];

/// Byte patterns (matched case-insensitively) that mark content as suspicious.
pub const SUSPICIOUS_PATTERNS: [&str; 10] = [
    "eval(",
    "exec(",
    "<script",
    "javascript:",
    "vbscript:",
    "data:text/html",
    "</script>",
    "<iframe",
    "<object",
    "<embed",
];

/// Share of NUL bytes (in percent) above which content is rejected.
pub const MAX_NULL_BYTE_PERCENT: usize = 30;

/// Only the first this-many lines are checked for length.
pub const LINE_SCAN_LIMIT: usize = 100;

/// Longest acceptable line in bytes.
pub const MAX_LINE_LENGTH: usize = 10_000;

/// MIME types accepted when ALLOWED_FILE_TYPES is not set.
pub const DEFAULT_ALLOWED_FILE_TYPES: [&str; 10] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "text/csv",
    "application/json",
];

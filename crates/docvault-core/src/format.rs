//! Small formatting helpers used in messages and statistics.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Human-readable size with one decimal: `512.0 B`, `1.5 KB`, `10.0 MB`.
pub fn format_size(size_bytes: u64) -> String {
    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} PB", size)
}

/// Size in megabytes with one decimal, as used in size-limit messages.
pub fn format_megabytes(size_bytes: usize) -> String {
    format!("{:.1}MB", size_bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0.0 B");
        assert_eq!(format_size(512), "512.0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_size(1024_u64.pow(5)), "1.0 PB");
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(10 * 1024 * 1024), "10.0MB");
        assert_eq!(format_megabytes(11 * 1024 * 1024 + 512 * 1024), "11.5MB");
    }
}

//! Input validation before an image is sent anywhere.

use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::AnalysisError;

/// Validates image files before encoding.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check a file's size on disk before it is read.
    pub fn check_size(&self, path: &Path, len: u64) -> Result<(), AnalysisError> {
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if len > max_bytes {
            return Err(AnalysisError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: len / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }
        Ok(())
    }

    /// Check an image's bytes after reading.
    ///
    /// Checks:
    /// - Size is within limits
    /// - Header magic bytes belong to a known image format
    ///
    /// Returns the detected MIME type.
    pub fn validate_bytes(&self, path: &Path, bytes: &[u8]) -> Result<&'static str, AnalysisError> {
        self.check_size(path, bytes.len() as u64)?;

        if bytes.len() < 4 {
            return Err(AnalysisError::ImageRead {
                path: path.to_path_buf(),
                message: "File too small to be a valid image".to_string(),
            });
        }

        sniff_media_type(bytes).ok_or_else(|| AnalysisError::ImageRead {
            path: path.to_path_buf(),
            message: "Unrecognized image format (invalid magic bytes)".to_string(),
        })
    }
}

/// Detect an image MIME type from its header bytes.
pub fn sniff_media_type(header: &[u8]) -> Option<&'static str> {
    match header {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("image/tiff"),
        [_, _, _, _, b'f', b't', b'y', b'p', b'a', b'v', b'i', b'f', ..] => Some("image/avif"),
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => Some("image/heic"),
        _ => None,
    }
}

/// MIME type implied by a file extension.
pub fn media_type_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "heic" | "heif" => Some("image/heic"),
        "avif" => Some("image/avif"),
        _ => None,
    }
}

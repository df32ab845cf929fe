//! Input format detection.
//!
//! The format of an upload is decided from its magic bytes. The declared
//! content type is only a hint used for logging mismatches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of input formats the transform core accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
}

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const GIF87_MAGIC: &[u8] = b"GIF87a";
const GIF89_MAGIC: &[u8] = b"GIF89a";
const BMP_MAGIC: &[u8] = b"BM";
/// DIB header sizes from BITMAPCOREHEADER (12) up to BITMAPV5HEADER (124).
const BMP_DIB_HEADER_SIZES: [u32; 7] = [12, 40, 52, 56, 64, 108, 124];

impl SourceFormat {
    /// Every supported format, in allowlist order.
    pub const ALL: [SourceFormat; 4] = [
        SourceFormat::Jpeg,
        SourceFormat::Png,
        SourceFormat::Gif,
        SourceFormat::Bmp,
    ];

    /// Detect the format from the leading bytes of `data`.
    ///
    /// Returns `None` when the bytes do not start with one of the supported
    /// magic headers.
    ///
    /// ```rust
    /// use transform::SourceFormat;
    ///
    /// assert_eq!(SourceFormat::sniff(b"GIF89a...."), Some(SourceFormat::Gif));
    /// assert_eq!(SourceFormat::sniff(b"hello world"), None);
    /// ```
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(JPEG_MAGIC) {
            Some(SourceFormat::Jpeg)
        } else if data.starts_with(PNG_MAGIC) {
            Some(SourceFormat::Png)
        } else if data.starts_with(GIF87_MAGIC) || data.starts_with(GIF89_MAGIC) {
            Some(SourceFormat::Gif)
        } else if is_bmp(data) {
            Some(SourceFormat::Bmp)
        } else {
            None
        }
    }

    /// Map a MIME type (parameters ignored) onto a supported format.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .map(str::trim)
            .unwrap_or(content_type)
            .to_ascii_lowercase();

        match mime.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(SourceFormat::Jpeg),
            "image/png" => Some(SourceFormat::Png),
            "image/gif" => Some(SourceFormat::Gif),
            "image/bmp" | "image/x-bmp" | "image/x-ms-bmp" => Some(SourceFormat::Bmp),
            _ => None,
        }
    }

    /// Canonical MIME type for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "image/jpeg",
            SourceFormat::Png => "image/png",
            SourceFormat::Gif => "image/gif",
            SourceFormat::Bmp => "image/bmp",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Png => "png",
            SourceFormat::Gif => "gif",
            SourceFormat::Bmp => "bmp",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SourceFormat> for image::ImageFormat {
    fn from(format: SourceFormat) -> Self {
        match format {
            SourceFormat::Jpeg => image::ImageFormat::Jpeg,
            SourceFormat::Png => image::ImageFormat::Png,
            SourceFormat::Gif => image::ImageFormat::Gif,
            SourceFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// `BM` alone is too weak a signature, so the DIB header size at offset 14
/// must also be one of the known values.
fn is_bmp(data: &[u8]) -> bool {
    data.starts_with(BMP_MAGIC)
        && data
            .get(14..18)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .is_some_and(|size| BMP_DIB_HEADER_SIZES.contains(&size))
}

/// Best-effort name for bytes that did not sniff as a supported format.
///
/// Used only for error messages, so a WebP upload is reported as `webp`
/// rather than as an anonymous failure.
pub(crate) fn describe_unsupported(data: &[u8]) -> String {
    match image::guess_format(data) {
        // A weak match on a supported signature that failed the strict sniff.
        Ok(format) if SourceFormat::ALL.iter().any(|f| image::ImageFormat::from(*f) == format) => {
            "unknown".to_string()
        }
        Ok(format) => format
            .extensions_str()
            .first()
            .map(|ext| (*ext).to_string())
            .unwrap_or_else(|| format!("{format:?}").to_ascii_lowercase()),
        Err(_) => "unknown".to_string(),
    }
}

//! Error types produced by the transform core.
//!
//! Every failure of [`Transformer::process`](crate::Transformer::process) is
//! reported as a typed [`TransformError`]. Callers (the HTTP layer in
//! particular) map each variant onto a status code without parsing messages.
//!
//! # Error Categories
//!
//! | Error | Category | Status |
//! |-------|----------|--------|
//! | [`EmptyInput`](TransformError::EmptyInput) | Client | 400 |
//! | [`InvalidWatermarkText`](TransformError::InvalidWatermarkText) | Client | 400 |
//! | [`PayloadTooLarge`](TransformError::PayloadTooLarge) | Client | 413 |
//! | [`UnsupportedFormat`](TransformError::UnsupportedFormat) | Client | 415 |
//! | [`DecodeFailure`](TransformError::DecodeFailure) | Client | 422 |
//! | [`DimensionsExceeded`](TransformError::DimensionsExceeded) | Client | 422 |
//! | [`EncodeFailure`](TransformError::EncodeFailure) | Server | 500 |
//!
//! # Example
//!
//! ```rust
//! use transform::TransformError;
//!
//! fn to_http_status(error: &TransformError) -> u16 {
//!     error.http_status_code()
//! }
//!
//! let err = TransformError::UnsupportedFormat { format: "webp".into() };
//! assert_eq!(to_http_status(&err), 415);
//! assert!(err.is_client_error());
//! ```
use thiserror::Error;

/// Errors that can occur while turning uploaded bytes into a watermarked JPEG.
///
/// The enum is marked `#[non_exhaustive]`; match with a catch-all arm.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransformError {
    /// The upload contained zero bytes.
    #[error("image payload is empty")]
    EmptyInput,

    /// The upload exceeds the configured byte limit.
    ///
    /// The gateway normally enforces this first; the core re-checks it so a
    /// misconfigured proxy cannot push arbitrarily large buffers through.
    #[error("image payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The sniffed format is not JPEG, PNG, GIF or BMP, or it is not in the
    /// configured allowlist.
    #[error("unsupported image format: {format}")]
    UnsupportedFormat { format: String },

    /// The bytes carry a supported magic header but do not decode.
    #[error("failed to decode image: {0}")]
    DecodeFailure(String),

    /// The declared image dimensions exceed the decode limits.
    #[error("image dimensions {width}x{height} exceed limit: {limit}")]
    DimensionsExceeded {
        width: u32,
        height: u32,
        limit: String,
    },

    /// The per-request watermark text was rejected.
    #[error("invalid watermark text: {0}")]
    InvalidWatermarkText(String),

    /// Re-encoding the composited buffer as JPEG failed.
    #[error("failed to encode JPEG: {0}")]
    EncodeFailure(String),
}

impl TransformError {
    /// Returns true if the error was caused by the caller's input.
    ///
    /// ```rust
    /// use transform::TransformError;
    ///
    /// assert!(TransformError::EmptyInput.is_client_error());
    /// assert!(!TransformError::EncodeFailure("oom".into()).is_client_error());
    /// ```
    pub fn is_client_error(&self) -> bool {
        !matches!(self, TransformError::EncodeFailure(_))
    }

    /// Returns the HTTP status code this error should surface as.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TransformError::EmptyInput | TransformError::InvalidWatermarkText(_) => 400,
            TransformError::PayloadTooLarge { .. } => 413,
            TransformError::UnsupportedFormat { .. } => 415,
            TransformError::DecodeFailure(_) | TransformError::DimensionsExceeded { .. } => 422,
            TransformError::EncodeFailure(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            TransformError::EmptyInput => "EMPTY_INPUT",
            TransformError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            TransformError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            TransformError::DecodeFailure(_) => "DECODE_FAILURE",
            TransformError::DimensionsExceeded { .. } => "DIMENSIONS_EXCEEDED",
            TransformError::InvalidWatermarkText(_) => "INVALID_WATERMARK_TEXT",
            TransformError::EncodeFailure(_) => "ENCODE_FAILURE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_split_client_and_server_errors() {
        let cases = [
            (TransformError::EmptyInput, 400),
            (
                TransformError::PayloadTooLarge {
                    size: 11,
                    limit: 10,
                },
                413,
            ),
            (
                TransformError::UnsupportedFormat {
                    format: "webp".into(),
                },
                415,
            ),
            (TransformError::DecodeFailure("eof".into()), 422),
            (
                TransformError::DimensionsExceeded {
                    width: 1,
                    height: 1,
                    limit: "0 pixels".into(),
                },
                422,
            ),
            (TransformError::InvalidWatermarkText("x".into()), 400),
            (TransformError::EncodeFailure("oom".into()), 500),
        ];

        for (err, status) in cases {
            assert_eq!(err.http_status_code(), status, "{err}");
            assert_eq!(err.is_client_error(), status < 500, "{err}");
        }
    }

    #[test]
    fn display_includes_context() {
        let err = TransformError::PayloadTooLarge {
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "image payload of 2048 bytes exceeds limit of 1024 bytes"
        );

        let err = TransformError::UnsupportedFormat {
            format: "webp".into(),
        };
        assert_eq!(err.to_string(), "unsupported image format: webp");
        assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
    }
}

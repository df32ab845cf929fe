//! Image Transform Core
//!
//! Takes the raw bytes of an uploaded image and hands back a watermarked
//! JPEG at the original resolution. Everything in here is synchronous and
//! pure: no disk or network I/O happens while processing, so the same bytes
//! and the same [`TransformConfig`] always give byte-identical output.
//!
//! ## What we do here
//!
//! - **Sniff the format** - The magic bytes decide, not the declared content
//!   type. JPEG, PNG, GIF and BMP are accepted; everything else is rejected
//!   with [`TransformError::UnsupportedFormat`].
//! - **Decode safely** - Dimensions are checked from the header before pixels
//!   are allocated. EXIF orientation is applied so phone photos come out
//!   upright.
//! - **Draw the watermark** - Text with an outline stroke, anchored on a
//!   nine-grid or tiled across the image, blended with Porter-Duff "over".
//! - **Re-encode** - Transparency is flattened against the background color
//!   and the result is written as baseline JPEG.
//!
//! ## Main entry point
//!
//! Build a [`Transformer`] once from a validated [`TransformConfig`], then call
//! [`Transformer::process`] per upload. The transformer is immutable and can
//! be shared across threads.
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use image::{ImageFormat, Rgb, RgbImage};
//! use transform::{SourceFormat, TransformConfig, Transformer};
//!
//! let mut png = Cursor::new(Vec::new());
//! RgbImage::from_pixel(320, 240, Rgb([40, 90, 160]))
//!     .write_to(&mut png, ImageFormat::Png)
//!     .unwrap();
//!
//! let transformer = Transformer::new(TransformConfig::default()).unwrap();
//! let output = transformer.process(png.get_ref(), Some("image/png")).unwrap();
//!
//! assert_eq!((output.width, output.height), (320, 240));
//! assert_eq!(output.source_format, SourceFormat::Png);
//! assert_eq!(&output.data[..3], &[0xFF, 0xD8, 0xFF]);
//! ```
use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, warn, Level};

mod config;
mod decode;
mod encode;
mod error;
mod format;
pub mod watermark;

pub use crate::config::{
    Anchor, Color, ConfigError, FontSizing, Layout, TransformConfig, WatermarkSpec,
};
pub use crate::encode::flatten;
pub use crate::error::TransformError;
pub use crate::format::SourceFormat;
pub use crate::watermark::text::TextRenderer;
pub use crate::watermark::AppliedWatermark;

/// A watermarked JPEG and the facts about where it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    /// Encoded JPEG bytes.
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// Format the input was decoded as.
    pub source_format: SourceFormat,
}

impl ProcessedImage {
    /// MIME type of [`ProcessedImage::data`]; always JPEG.
    pub fn content_type(&self) -> &'static str {
        "image/jpeg"
    }
}

impl fmt::Debug for ProcessedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessedImage")
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("source_format", &self.source_format)
            .finish()
    }
}

/// Validated configuration plus the loaded font.
#[derive(Debug, Clone)]
pub struct Transformer {
    config: TransformConfig,
    renderer: TextRenderer,
}

impl Transformer {
    /// Validate `config` and load its font.
    ///
    /// This is the only place a font file is read from disk.
    pub fn new(config: TransformConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let renderer = TextRenderer::load(config.watermark.font_path.as_deref())?;
        Ok(Self { config, renderer })
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Watermark `data` with the configured text.
    ///
    /// `declared_content_type` is a hint only; a mismatch with the sniffed
    /// format is logged and otherwise ignored.
    pub fn process(
        &self,
        data: &[u8],
        declared_content_type: Option<&str>,
    ) -> Result<ProcessedImage, TransformError> {
        self.process_with_text(data, declared_content_type, None)
    }

    /// Like [`Transformer::process`], drawing `text` instead of the configured
    /// text. `None` or a blank string falls back to the configured text.
    pub fn process_with_text(
        &self,
        data: &[u8],
        declared_content_type: Option<&str>,
        text: Option<&str>,
    ) -> Result<ProcessedImage, TransformError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::INFO,
            "transform.process",
            input_bytes = data.len(),
            declared = declared_content_type.unwrap_or("-")
        );
        let _guard = span.enter();

        match self.process_inner(data, declared_content_type, text) {
            Ok(image) => {
                let elapsed_micros = start.elapsed().as_micros();
                info!(
                    source_format = %image.source_format,
                    width = image.width,
                    height = image.height,
                    output_bytes = image.data.len(),
                    elapsed_micros,
                    "transform_success"
                );
                Ok(image)
            }
            Err(err) => {
                let elapsed_micros = start.elapsed().as_micros();
                warn!(error = %err, code = err.code(), elapsed_micros, "transform_failure");
                Err(err)
            }
        }
    }

    fn process_inner(
        &self,
        data: &[u8],
        declared_content_type: Option<&str>,
        text: Option<&str>,
    ) -> Result<ProcessedImage, TransformError> {
        let text = self.resolve_text(text)?;

        if data.is_empty() {
            return Err(TransformError::EmptyInput);
        }
        if let Some(limit) = self.config.max_input_bytes {
            if data.len() > limit {
                return Err(TransformError::PayloadTooLarge {
                    size: data.len(),
                    limit,
                });
            }
        }

        let format = match SourceFormat::sniff(data) {
            Some(format) if self.config.is_allowed(format) => format,
            Some(format) => {
                return Err(TransformError::UnsupportedFormat {
                    format: format.to_string(),
                });
            }
            None => {
                return Err(TransformError::UnsupportedFormat {
                    format: format::describe_unsupported(data),
                });
            }
        };

        if let Some(declared) = declared_content_type {
            match SourceFormat::from_mime(declared) {
                Some(hint) if hint == format => {}
                Some(hint) => warn!(
                    declared = %hint,
                    sniffed = %format,
                    "declared content type does not match sniffed format"
                ),
                None => debug!(declared, sniffed = %format, "declared content type not an image type"),
            }
        }

        let mut image = decode::decode_rgba(data, format, &self.config)?;
        let (width, height) = image.dimensions();
        debug!(%format, width, height, "decoded");

        watermark::apply(&mut image, &self.config.watermark, &self.renderer, text);

        let jpeg = encode::encode_jpeg(&image, self.config.background, self.config.jpeg_quality)?;

        Ok(ProcessedImage {
            data: Bytes::from(jpeg),
            width,
            height,
            source_format: format,
        })
    }

    /// Per-request text, or the configured text when absent or blank.
    fn resolve_text<'a>(&'a self, text: Option<&'a str>) -> Result<&'a str, TransformError> {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(self.config.watermark.text.as_str());
        };
        let chars = text.chars().count();
        if chars > self.config.max_text_chars {
            return Err(TransformError::InvalidWatermarkText(format!(
                "{chars} characters exceeds limit of {}",
                self.config.max_text_chars
            )));
        }
        if text.chars().any(char::is_control) {
            return Err(TransformError::InvalidWatermarkText(
                "contains control characters".into(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transformer() -> Transformer {
        Transformer::new(TransformConfig::default()).unwrap()
    }

    #[test]
    fn blank_text_falls_back_to_configured_text() {
        let t = transformer();
        assert_eq!(t.resolve_text(None).unwrap(), "Sample");
        assert_eq!(t.resolve_text(Some("   ")).unwrap(), "Sample");
        assert_eq!(t.resolve_text(Some(" Draft ")).unwrap(), "Draft");
    }

    #[test]
    fn rejects_bad_text() {
        let t = transformer();
        let long = "x".repeat(101);
        assert!(matches!(
            t.resolve_text(Some(&long)),
            Err(TransformError::InvalidWatermarkText(_))
        ));
        assert!(matches!(
            t.resolve_text(Some("a\u{7}b")),
            Err(TransformError::InvalidWatermarkText(_))
        ));
    }

    #[test]
    fn empty_input_is_rejected_first() {
        assert_eq!(transformer().process(&[], None), Err(TransformError::EmptyInput));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Transformer::new(TransformConfig::default().with_jpeg_quality(101)).unwrap_err();
        assert_eq!(err, ConfigError::InvalidQuality(101));
    }
}

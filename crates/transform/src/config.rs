//! Configuration types for the transform core.
//!
//! [`TransformConfig`] is built once at process start (usually deserialized
//! from the YAML configuration file), validated, and then handed to
//! [`Transformer::new`](crate::Transformer::new). Nothing in this module reads
//! the environment; the transform is a pure function of
//! `(bytes, TransformConfig)`.
//!
//! # Defaults
//!
//! ```rust
//! use transform::{Anchor, Layout, TransformConfig};
//!
//! let config = TransformConfig::default();
//! assert_eq!(config.jpeg_quality, 95);
//! assert_eq!(config.watermark.text, "Sample");
//! assert_eq!(
//!     config.watermark.layout,
//!     Layout::Anchored { anchor: Anchor::BottomRight, margin: 16 }
//! );
//! config.validate().expect("defaults are valid");
//! ```
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::SourceFormat;

/// Errors raised while validating a [`TransformConfig`] or loading its font.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("allowed_formats must contain at least one format")]
    EmptyAllowlist,
    #[error("jpeg_quality must be within 1..=100 (got {0})")]
    InvalidQuality(u8),
    #[error("{field} must be within 0.0..=1.0 (got {value})")]
    InvalidOpacity { field: &'static str, value: f32 },
    #[error("watermark text must not be empty")]
    EmptyText,
    #[error("invalid font size configuration: {0}")]
    InvalidFontSize(String),
    #[error("invalid layout configuration: {0}")]
    InvalidLayout(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid color '{0}': expected #RGB or #RRGGBB")]
    InvalidColor(String),
    #[error("failed to load font: {0}")]
    Font(String),
}

/// An opaque RGB color, written as `#RGB` or `#RRGGBB` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RGB` or `#RRGGBB` hex string.
    ///
    /// ```rust
    /// use transform::Color;
    ///
    /// assert_eq!(Color::parse_hex("#FFF").unwrap(), Color::WHITE);
    /// assert_eq!(Color::parse_hex("#ff8000").unwrap(), Color::new(255, 128, 0));
    /// assert!(Color::parse_hex("ff8000").is_err());
    /// ```
    pub fn parse_hex(hex: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidColor(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match digits.len() {
            // #RGB doubles each digit: 0xF -> 0xFF
            3 => Ok(Color::new(
                channel(&digits[0..1])? * 17,
                channel(&digits[1..2])? * 17,
                channel(&digits[2..3])? * 17,
            )),
            6 => Ok(Color::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Nine-grid anchor for a single watermark placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// How the rendered overlay is laid out over the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Layout {
    /// One overlay at `anchor`, offset `margin` pixels from the edges.
    Anchored { anchor: Anchor, margin: u32 },
    /// Repeating grid covering the whole image.
    ///
    /// Spacing is given at the reference font size and scaled with the
    /// effective font size. With `stagger`, every other row is shifted by half
    /// a column.
    Tiled {
        spacing_x: u32,
        spacing_y: u32,
        #[serde(default = "default_true")]
        stagger: bool,
    },
}

impl Default for Layout {
    fn default() -> Self {
        Layout::Anchored {
            anchor: Anchor::BottomRight,
            margin: 16,
        }
    }
}

/// Font size policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FontSizing {
    /// Always render at `px`.
    Fixed { px: f32 },
    /// `large_px` when both sides exceed `threshold`, otherwise
    /// `max(min(width, height) / divisor, min_px)`.
    Adaptive {
        threshold: u32,
        large_px: f32,
        divisor: u32,
        min_px: f32,
    },
}

impl FontSizing {
    /// Font size used to scale stroke width and tile spacing.
    pub fn reference_px(&self) -> f32 {
        match *self {
            FontSizing::Fixed { px } => px,
            FontSizing::Adaptive { large_px, .. } => large_px,
        }
    }

    /// Effective font size for an image of `width` x `height`.
    ///
    /// ```rust
    /// use transform::FontSizing;
    ///
    /// let sizing = FontSizing::default();
    /// assert_eq!(sizing.size_for(1920, 1080), 72.0);
    /// assert_eq!(sizing.size_for(800, 600), 75.0);
    /// assert_eq!(sizing.size_for(100, 100), 24.0);
    /// ```
    pub fn size_for(&self, width: u32, height: u32) -> f32 {
        match *self {
            FontSizing::Fixed { px } => px,
            FontSizing::Adaptive {
                threshold,
                large_px,
                divisor,
                min_px,
            } => {
                if width > threshold && height > threshold {
                    large_px
                } else {
                    let relative = (width.min(height) / divisor.max(1)) as f32;
                    relative.max(min_px)
                }
            }
        }
    }
}

impl Default for FontSizing {
    fn default() -> Self {
        FontSizing::Adaptive {
            threshold: 1000,
            large_px: 72.0,
            divisor: 8,
            min_px: 24.0,
        }
    }
}

/// Description of the text overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSpec {
    /// Text drawn when the request does not override it.
    pub text: String,
    pub layout: Layout,
    pub font_size: FontSizing,
    pub fill_color: Color,
    /// Fill opacity (0.0 to 1.0).
    pub fill_opacity: f32,
    pub stroke_color: Color,
    /// Stroke opacity (0.0 to 1.0).
    pub stroke_opacity: f32,
    /// Outline width in pixels at the reference font size; 0 disables it.
    pub stroke_width: u32,
    /// Clockwise rotation of the rendered text.
    pub rotation_degrees: f32,
    /// TrueType/OpenType font file. The embedded DejaVu Sans is used when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: "Sample".to_string(),
            layout: Layout::default(),
            font_size: FontSizing::default(),
            fill_color: Color::WHITE,
            fill_opacity: 150.0 / 255.0,
            stroke_color: Color::BLACK,
            stroke_opacity: 120.0 / 255.0,
            stroke_width: 4,
            rotation_degrees: 0.0,
            font_path: None,
        }
    }
}

impl WatermarkSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text.trim().is_empty() {
            return Err(ConfigError::EmptyText);
        }
        for (field, value) in [
            ("fill_opacity", self.fill_opacity),
            ("stroke_opacity", self.stroke_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidOpacity { field, value });
            }
        }
        match self.font_size {
            FontSizing::Fixed { px } if !(px.is_finite() && px >= 1.0) => {
                return Err(ConfigError::InvalidFontSize(format!(
                    "fixed size must be >= 1 (got {px})"
                )));
            }
            FontSizing::Adaptive {
                large_px,
                divisor,
                min_px,
                ..
            } => {
                if divisor == 0 {
                    return Err(ConfigError::InvalidFontSize(
                        "divisor must be positive".into(),
                    ));
                }
                if !(large_px.is_finite() && large_px >= 1.0 && min_px.is_finite() && min_px >= 1.0)
                {
                    return Err(ConfigError::InvalidFontSize(format!(
                        "sizes must be >= 1 (large_px {large_px}, min_px {min_px})"
                    )));
                }
            }
            FontSizing::Fixed { .. } => {}
        }
        if let Layout::Tiled {
            spacing_x,
            spacing_y,
            ..
        } = self.layout
        {
            if spacing_x == 0 || spacing_y == 0 {
                return Err(ConfigError::InvalidLayout(
                    "tile spacing must be positive".into(),
                ));
            }
        }
        if !self.rotation_degrees.is_finite() {
            return Err(ConfigError::InvalidLayout(
                "rotation_degrees must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Runtime configuration for the transform core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Formats accepted after sniffing.
    pub allowed_formats: Vec<SourceFormat>,
    /// JPEG output quality (1-100).
    pub jpeg_quality: u8,
    /// Color transparent regions are flattened against.
    pub background: Color,
    /// Byte limit re-checked by the core. `None` trusts the gateway.
    pub max_input_bytes: Option<usize>,
    /// Maximum width or height of a decoded image.
    pub max_dimension: u32,
    /// Maximum total pixels of a decoded image.
    pub max_pixels: u64,
    /// Rotate/flip according to the EXIF orientation tag before watermarking.
    pub apply_exif_orientation: bool,
    /// Maximum length of per-request watermark text, in characters.
    pub max_text_chars: usize,
    pub watermark: WatermarkSpec,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            allowed_formats: SourceFormat::ALL.to_vec(),
            jpeg_quality: 95,
            background: Color::WHITE,
            max_input_bytes: Some(10 * 1024 * 1024),
            max_dimension: 16_384,
            max_pixels: 100_000_000,
            apply_exif_orientation: true,
            max_text_chars: 100,
            watermark: WatermarkSpec::default(),
        }
    }
}

impl TransformConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watermark(mut self, watermark: WatermarkSpec) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_allowed_formats(mut self, formats: impl Into<Vec<SourceFormat>>) -> Self {
        self.allowed_formats = formats.into();
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_max_input_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_formats.is_empty() {
            return Err(ConfigError::EmptyAllowlist);
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::InvalidQuality(self.jpeg_quality));
        }
        if self.max_input_bytes == Some(0) {
            return Err(ConfigError::InvalidLimit(
                "max_input_bytes must be positive".into(),
            ));
        }
        // JPEG cannot address more than 65535 pixels per side.
        if self.max_dimension == 0 || self.max_dimension > u32::from(u16::MAX) {
            return Err(ConfigError::InvalidLimit(format!(
                "max_dimension must be within 1..=65535 (got {})",
                self.max_dimension
            )));
        }
        if self.max_pixels == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_pixels must be positive".into(),
            ));
        }
        if self.max_text_chars == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_text_chars must be positive".into(),
            ));
        }
        self.watermark.validate()
    }

    pub fn is_allowed(&self, format: SourceFormat) -> bool {
        self.allowed_formats.contains(&format)
    }
}

fn default_true() -> bool {
    true
}

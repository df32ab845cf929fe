//! YAML configuration file support.
//!
//! The watermark look and the decode limits live in a single YAML file that
//! is read once at start-up and turned into a [`Transformer`]. Every field is
//! optional; anything left out keeps its default.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "storefront previews"
//!
//! transform:
//!   jpeg_quality: 95
//!   background: "#FFFFFF"
//!   allowed_formats: [jpeg, png, gif, bmp]
//!   max_input_bytes: 10485760
//!   max_dimension: 16384
//!   max_pixels: 100000000
//!   apply_exif_orientation: true
//!   max_text_chars: 100
//!   watermark:
//!     text: "Sample"
//!     font_size: { mode: adaptive, threshold: 1000, large_px: 72, divisor: 8, min_px: 24 }
//!     layout: { mode: tiled, spacing_x: 280, spacing_y: 200, stagger: true }
//!     rotation_degrees: 30
//!     fill_color: "#FFFFFF"
//!     fill_opacity: 0.59
//!     stroke_color: "#000000"
//!     stroke_opacity: 0.47
//!     stroke_width: 4
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use transform::{ConfigError, TransformConfig, Transformer};

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(#[from] ConfigError),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessorConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Transform core configuration
    #[serde(default)]
    pub transform: TransformConfig,
}

impl ProcessorConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: ProcessorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;
        self.transform.validate()?;
        Ok(())
    }

    /// Build the transformer, loading the configured font if any.
    pub fn into_transformer(self) -> Result<Transformer, ConfigLoadError> {
        Ok(Transformer::new(self.transform)?)
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            transform: TransformConfig::default(),
        }
    }
}

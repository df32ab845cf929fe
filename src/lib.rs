//! Umbrella crate for the watermark processor.
//!
//! Re-exports the transform core, loads the YAML configuration file, and
//! wraps processing with an optional metrics observer so callers get a single
//! entry point: [`process_image`].

pub mod config;

pub use config::{ConfigLoadError, ProcessorConfig};
pub use transform::{
    Anchor, Color, ConfigError, FontSizing, Layout, ProcessedImage, SourceFormat, TextRenderer,
    TransformConfig, TransformError, Transformer, WatermarkSpec,
};

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Metrics observer for processed images.
pub trait ProcessMetrics: Send + Sync {
    /// Called once per [`process_image`] call with its latency and outcome.
    fn record_process(
        &self,
        latency: Duration,
        source_format: Option<SourceFormat>,
        result: Result<(), TransformError>,
    );
}

/// Install or clear the global metrics recorder.
pub fn set_process_metrics(recorder: Option<Arc<dyn ProcessMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn ProcessMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn ProcessMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn ProcessMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn ProcessMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record(self, result: &Result<ProcessedImage, TransformError>) {
        let (format, outcome) = match result {
            Ok(image) => (Some(image.source_format), Ok(())),
            Err(err) => (None, Err(err.clone())),
        };
        self.recorder
            .record_process(self.start.elapsed(), format, outcome);
    }
}

/// Watermark `data` and re-encode it as JPEG.
///
/// `text` overrides the configured watermark text for this call; `None` or
/// a blank string keeps the configured one. The installed
/// [`ProcessMetrics`] recorder, if any, sees every outcome.
pub fn process_image(
    transformer: &Transformer,
    data: &[u8],
    declared_content_type: Option<&str>,
    text: Option<&str>,
) -> Result<ProcessedImage, TransformError> {
    let span = MetricsSpan::start();
    let result = transformer.process_with_text(data, declared_content_type, text);
    if let Some(span) = span {
        span.record(&result);
    }
    result
}

/// Build a [`Transformer`] from an optional YAML file, defaults otherwise.
pub fn load_transformer(path: Option<&std::path::Path>) -> Result<Transformer, ConfigLoadError> {
    let config = match path {
        Some(path) => {
            let config = ProcessorConfig::from_file(path)?;
            tracing::info!(
                path = %path.display(),
                name = config.name.as_deref().unwrap_or("-"),
                "loaded watermark config"
            );
            config
        }
        None => ProcessorConfig::default(),
    };
    config.into_transformer()
}

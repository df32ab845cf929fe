//! Process metrics reported through tracing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use watermark_processor::{ProcessMetrics, SourceFormat, TransformError};

/// [`ProcessMetrics`] recorder that emits one structured event per image and
/// keeps running totals.
#[derive(Debug, Default)]
pub struct TracingMetrics {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl TracingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(succeeded, failed)` since start-up.
    pub fn totals(&self) -> (u64, u64) {
        (
            self.succeeded.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }
}

impl ProcessMetrics for TracingMetrics {
    fn record_process(
        &self,
        latency: Duration,
        source_format: Option<SourceFormat>,
        result: Result<(), TransformError>,
    ) {
        let latency_ms = latency.as_secs_f64() * 1000.0;
        match result {
            Ok(()) => {
                let total = self.succeeded.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!(
                    target: "watermark::metrics",
                    latency_ms,
                    source_format = source_format.map_or("-", SourceFormat::as_str),
                    outcome = "ok",
                    total,
                    "image processed"
                );
            }
            Err(err) => {
                let total = self.failed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!(
                    target: "watermark::metrics",
                    latency_ms,
                    outcome = err.code(),
                    total,
                    "image rejected"
                );
            }
        }
    }
}

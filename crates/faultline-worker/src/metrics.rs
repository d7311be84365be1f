//! Prometheus metrics for export runs.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::Arc;

use faultline_core::JobOutcome;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct OutcomeLabel(pub &'static str);

impl prometheus_client::encoding::EncodeLabelSet for OutcomeLabel {
    fn encode(
        &self,
        mut encoder: prometheus_client::encoding::LabelSetEncoder,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("outcome", self.0).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct WorkerMetrics {
    pub runs: Family<OutcomeLabel, Counter>,
    pub rows_exported: Counter,
    pub bytes_uploaded: Counter,
    pub last_success: Gauge,
    pub active_runs: Gauge,
    pub registry: Arc<Registry>,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let runs = Family::<OutcomeLabel, Counter>::default();
        registry.register(
            "faultline_runs",
            "Extraction attempts by outcome",
            runs.clone(),
        );

        let rows_exported = Counter::default();
        registry.register(
            "faultline_rows_exported",
            "Rows written to uploaded objects",
            rows_exported.clone(),
        );

        let bytes_uploaded = Counter::default();
        registry.register(
            "faultline_bytes_uploaded",
            "Payload bytes uploaded",
            bytes_uploaded.clone(),
        );

        let last_success = Gauge::default();
        registry.register(
            "faultline_last_success_timestamp_seconds",
            "Unix time of the last attempt that did not fail",
            last_success.clone(),
        );

        let active_runs = Gauge::default();
        registry.register(
            "faultline_active_runs",
            "Extraction attempts currently in flight",
            active_runs.clone(),
        );

        Self {
            runs,
            rows_exported,
            bytes_uploaded,
            last_success,
            active_runs,
            registry: Arc::new(registry),
        }
    }

    /// Account for one finished attempt.
    pub fn record(&self, outcome: &JobOutcome, finished_at: i64) {
        self.runs.get_or_create(&OutcomeLabel(outcome.label())).inc();
        match outcome {
            JobOutcome::Uploaded { rows, bytes, .. } => {
                self.rows_exported.inc_by(*rows);
                self.bytes_uploaded.inc_by(*bytes as u64);
                self.last_success.set(finished_at);
            }
            JobOutcome::Skipped { .. } => {
                self.last_success.set(finished_at);
            }
            JobOutcome::Failed { .. } => {}
        }
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        if let Err(e) = encode(&mut buf, &self.registry) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        buf
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

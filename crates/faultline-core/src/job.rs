//! Extraction job - one windowed extract, encode and upload run.
//!
//! ```text
//! Start → WindowComputed → Querying ─┬→ Empty ──────────────→ Skipped
//!                                    └→ Encoding → Uploading → Uploaded
//!                  (any stage after WindowComputed) ──────────→ Failed
//! ```
//!
//! The job never retries and never writes a partial object. Re-running the
//! same `now` targets the same window and the same destination name.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::encoder::DelimitedEncoder;
use crate::error::ExtractError;
use crate::namer::DestinationName;
use crate::sink::ObjectSink;
use crate::source::{QuerySpec, RowSource};
use crate::window::{Granularity, TimeWindow};

/// Everything that identifies one extraction feed.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Logical source name, used as the destination name prefix.
    pub source_name: String,
    pub query: QuerySpec,
    pub granularity: Granularity,
}

/// Stage at which a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Querying,
    Encoding,
    Uploading,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Querying => "querying",
            JobStage::Encoding => "encoding",
            JobStage::Uploading => "uploading",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoRows,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoRows => f.write_str("no rows"),
        }
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Uploaded {
        name: DestinationName,
        rows: u64,
        bytes: usize,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        stage: JobStage,
        cause: ExtractError,
    },
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Uploaded { .. } => "uploaded",
            JobOutcome::Skipped { .. } => "skipped",
            JobOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed { .. })
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Uploaded { name, rows, bytes } => {
                write!(f, "uploaded {} ({} rows, {} bytes)", name, rows, bytes)
            }
            JobOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            JobOutcome::Failed { stage, cause } => write!(f, "failed while {}: {}", stage, cause),
        }
    }
}

/// Drives a [`RowSource`] and an [`ObjectSink`] through one run.
pub struct ExtractionJob {
    spec: JobSpec,
    source: Arc<dyn RowSource>,
    sink: Arc<dyn ObjectSink>,
    encoder: DelimitedEncoder,
}

impl ExtractionJob {
    pub fn new(spec: JobSpec, source: Arc<dyn RowSource>, sink: Arc<dyn ObjectSink>) -> Self {
        Self {
            spec,
            source,
            sink,
            encoder: DelimitedEncoder::new(),
        }
    }

    pub fn with_encoder(mut self, encoder: DelimitedEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn window_for(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow::compute(now, self.spec.granularity)
    }

    /// Run for the window preceding the current wall-clock time.
    pub async fn run_now(&self, cancel: &CancellationToken) -> JobOutcome {
        self.run(Utc::now(), cancel).await
    }

    /// Run for the window preceding `now`.
    ///
    /// `cancel` is observed while opening the source, at every row fetch
    /// and during the upload; a cancelled run ends as
    /// `Failed { cause: Cancelled }`.
    pub async fn run(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> JobOutcome {
        let window = self.window_for(now);
        info!(
            source = %self.spec.source_name,
            query = %self.spec.query.name,
            %window,
            "Starting extraction"
        );

        let outcome = match self.execute(&window, cancel).await {
            Ok(outcome) => outcome,
            Err((stage, cause)) => JobOutcome::Failed { stage, cause },
        };

        match &outcome {
            JobOutcome::Uploaded { name, rows, bytes } => info!(
                source = %self.spec.source_name,
                %window,
                "Exported {} rows ({} bytes) to {}",
                rows,
                bytes,
                name
            ),
            JobOutcome::Skipped { reason } => info!(
                source = %self.spec.source_name,
                %window,
                "Nothing to export: {}",
                reason
            ),
            JobOutcome::Failed { stage, cause } => error!(
                source = %self.spec.source_name,
                %window,
                kind = cause.kind(),
                "Extraction failed while {}: {}",
                stage,
                cause
            ),
        }

        outcome
    }

    async fn execute(
        &self,
        window: &TimeWindow,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, (JobStage, ExtractError)> {
        let rows = until_cancelled(cancel, self.source.open(&self.spec.query, window))
            .await
            .map_err(|e| (JobStage::Querying, e))?;
        let mut rows = rows.with_cancellation(cancel.clone());

        if !rows.has_rows().await.map_err(|e| (JobStage::Querying, e))? {
            return Ok(JobOutcome::Skipped {
                reason: SkipReason::NoRows,
            });
        }

        let payload = self
            .encoder
            .encode(rows)
            .await
            .map_err(|e| (JobStage::Encoding, e))?;

        let name = DestinationName::new(&self.spec.source_name, window.to());
        let (row_count, bytes) = (payload.rows(), payload.len());

        until_cancelled(cancel, self.sink.put(&name, payload))
            .await
            .map_err(|e| (JobStage::Uploading, e))?;

        Ok(JobOutcome::Uploaded {
            name,
            rows: row_count,
            bytes,
        })
    }
}

async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ExtractError>
where
    F: Future<Output = Result<T, ExtractError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExtractError::Cancelled),
        res = fut => res,
    }
}

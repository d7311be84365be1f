//! Runner - fires the extraction job on schedule, retries failed attempts and
//! enforces the per-attempt timeout.
//!
//! All attempts belonging to one tick reuse the tick instant, so they target
//! the same window and the same destination name. Only `Failed` outcomes are
//! retried.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use faultline_core::{CancellationToken, ExtractionJob, JobOutcome, TimeWindow};

use crate::config::WorkerConfig;
use crate::metrics::WorkerMetrics;
use crate::schedule::{next_tick, until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per tick, including the first.
    pub max_attempts: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

impl From<&WorkerConfig> for RetryPolicy {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.retry_delay(),
            timeout: config.run_timeout(),
        }
    }
}

/// Summary of one tick, printed by `run-once`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub tick: DateTime<Utc>,
    pub window_from: DateTime<Utc>,
    pub window_to: DateTime<Utc>,
    pub attempts: u32,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    pub rows: u64,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub failed: bool,
}

impl RunReport {
    fn new(run_id: Uuid, tick: DateTime<Utc>, window: &TimeWindow, attempts: u32, outcome: &JobOutcome) -> Self {
        let (object, rows, bytes, error) = match outcome {
            JobOutcome::Uploaded { name, rows, bytes } => (Some(name.to_string()), *rows, *bytes, None),
            JobOutcome::Skipped { .. } => (None, 0, 0, None),
            JobOutcome::Failed { .. } => (None, 0, 0, Some(outcome.to_string())),
        };
        Self {
            run_id,
            tick,
            window_from: window.from(),
            window_to: window.to(),
            attempts,
            outcome: outcome.label(),
            object,
            rows,
            bytes,
            error,
            failed: outcome.is_failed(),
        }
    }
}

pub struct Runner {
    job: ExtractionJob,
    metrics: WorkerMetrics,
    policy: RetryPolicy,
    shutdown: CancellationToken,
}

impl Runner {
    pub fn new(
        job: ExtractionJob,
        metrics: WorkerMetrics,
        policy: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            job,
            metrics,
            policy,
            shutdown,
        }
    }

    /// Run ticks forever until shutdown.
    pub async fn serve(&self, offset: Duration) {
        let granularity = self.job.spec().granularity;
        info!(
            "Scheduler started (window: {}s, offset: {}s, attempts: {})",
            granularity.as_secs(),
            offset.as_secs(),
            self.policy.max_attempts
        );

        loop {
            let now = Utc::now();
            let tick = next_tick(now, granularity, offset);
            info!("Next run at {}", tick);

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(until(now, tick)) => {}
            }

            self.run_tick(tick).await;
        }

        info!("Scheduler stopped");
    }

    /// One tick: up to `max_attempts` attempts for the window preceding `tick`.
    pub async fn run_tick(&self, tick: DateTime<Utc>) -> RunReport {
        let run_id = Uuid::new_v4();
        let window = self.job.window_for(tick);
        let mut attempt = 1;

        loop {
            info!(%run_id, attempt, %window, "Starting attempt");
            let outcome = self.attempt(tick).await;

            let exhausted = attempt >= self.policy.max_attempts;
            if !outcome.is_failed() || exhausted || self.shutdown.is_cancelled() {
                if outcome.is_failed() {
                    error!(%run_id, attempt, %window, "Giving up: {}", outcome);
                }
                return RunReport::new(run_id, tick, &window, attempt, &outcome);
            }

            warn!(
                %run_id,
                attempt,
                "Attempt {}; retrying in {}s",
                outcome,
                self.policy.delay.as_secs()
            );
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return RunReport::new(run_id, tick, &window, attempt, &outcome);
                }
                _ = tokio::time::sleep(self.policy.delay) => {}
            }
            attempt += 1;
        }
    }

    /// A single attempt bounded by the policy timeout and by shutdown.
    pub async fn attempt(&self, tick: DateTime<Utc>) -> JobOutcome {
        let cancel = self.shutdown.child_token();
        self.metrics.active_runs.inc();

        let run = self.job.run(tick, &cancel);
        tokio::pin!(run);
        let first = tokio::time::timeout(self.policy.timeout, &mut run).await;
        let outcome = match first {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Attempt exceeded {}s timeout, cancelling",
                    self.policy.timeout.as_secs()
                );
                cancel.cancel();
                run.await
            }
        };

        self.metrics.active_runs.dec();
        self.metrics.record(&outcome, Utc::now().timestamp());
        outcome
    }
}

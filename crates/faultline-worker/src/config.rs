//! Worker configuration from environment variables.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use faultline_connectors::WriteMode;
use faultline_core::{Granularity, JobSpec, QuerySpec};

#[derive(Clone)]
pub struct WorkerConfig {
    /// Source database connection string (redacted in Debug output).
    pub database_url: String,
    /// Logical source name; prefix of every destination object name.
    pub source_name: String,
    /// Integer source id bound as `$1`.
    pub site_id: i32,
    /// Export statement taking `$1` site id, `$2` window start, `$3` window end.
    pub export_query: String,
    pub destination_url: String,
    pub granularity: Granularity,
    /// Delay after each window boundary before the run fires.
    pub schedule_offset_secs: u64,
    pub run_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub create_only: bool,
    pub db_max_connections: u32,
    pub metrics_port: u16,
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("database_url", &"***")
            .field("source_name", &self.source_name)
            .field("site_id", &self.site_id)
            .field("export_query", &self.export_query)
            .field("destination_url", &self.destination_url)
            .field("granularity", &self.granularity.as_secs())
            .field("schedule_offset_secs", &self.schedule_offset_secs)
            .field("run_timeout_secs", &self.run_timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("create_only", &self.create_only)
            .field("db_max_connections", &self.db_max_connections)
            .field("metrics_port", &self.metrics_port)
            .finish()
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let window_secs: u32 = std::env::var("WINDOW_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .context("Invalid WINDOW_SECS")?;
        let granularity =
            Granularity::from_secs(window_secs).context("WINDOW_SECS must be greater than zero")?;

        let schedule_offset_secs: u64 = std::env::var("SCHEDULE_OFFSET_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .context("Invalid SCHEDULE_OFFSET_SECS")?;
        anyhow::ensure!(
            schedule_offset_secs < u64::from(granularity.as_secs()),
            "SCHEDULE_OFFSET_SECS must be shorter than WINDOW_SECS"
        );

        let max_attempts: u32 = std::env::var("MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("Invalid MAX_ATTEMPTS")?;
        anyhow::ensure!(max_attempts >= 1, "MAX_ATTEMPTS must be at least 1");

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            source_name: std::env::var("SOURCE_NAME").context("SOURCE_NAME not set")?,
            site_id: std::env::var("SITE_ID")
                .context("SITE_ID not set")?
                .parse()
                .context("Invalid SITE_ID")?,
            export_query: std::env::var("EXPORT_QUERY").context("EXPORT_QUERY not set")?,
            destination_url: std::env::var("DESTINATION_URL")
                .context("DESTINATION_URL not set")?,
            granularity,
            schedule_offset_secs,
            run_timeout_secs: std::env::var("RUN_TIMEOUT_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .context("Invalid RUN_TIMEOUT_SECS")?,
            max_attempts,
            retry_delay_secs: std::env::var("RETRY_DELAY_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid RETRY_DELAY_SECS")?,
            create_only: std::env::var("CREATE_ONLY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("Invalid DB_MAX_CONNECTIONS")?,
            metrics_port: std::env::var("METRICS_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()
                .context("Invalid METRICS_PORT")?,
        })
    }

    pub fn job_spec(&self) -> JobSpec {
        JobSpec {
            source_name: self.source_name.clone(),
            query: QuerySpec::new(
                self.source_name.clone(),
                self.export_query.clone(),
                self.site_id,
            ),
            granularity: self.granularity,
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.create_only {
            WriteMode::CreateOnly
        } else {
            WriteMode::Overwrite
        }
    }

    pub fn schedule_offset(&self) -> Duration {
        Duration::from_secs(self.schedule_offset_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

//! faultline-worker binary - scheduled window exports to object storage.

mod config;
mod health;
mod metrics;
mod runner;
mod schedule;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use faultline_connectors::{ObjectStoreSink, PostgresRowSource};
use faultline_core::{CancellationToken, ExtractionJob};

use config::WorkerConfig;
use health::EndpointState;
use metrics::WorkerMetrics;
use runner::{RetryPolicy, Runner};

/// How long a run waits for a pooled database connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "faultline-worker", about = "Scheduled window export worker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run on schedule, with retries and health/metrics endpoints
    Serve,

    /// Export a single window and exit non-zero if it failed
    RunOnce {
        /// Run as if the current time were this RFC 3339 instant
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let job = build_job(&config)?;
    let worker_metrics = WorkerMetrics::new();

    let shutdown = CancellationToken::new();
    let ready = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        let ready = ready.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                ready.store(false, Ordering::Relaxed);
                shutdown.cancel();
            }
        });
    }

    let runner = Runner::new(
        job,
        worker_metrics.clone(),
        RetryPolicy::from(&config),
        shutdown.clone(),
    );

    match cli.command {
        Commands::Serve => {
            let endpoint_state = Arc::new(EndpointState {
                metrics: worker_metrics,
                accepting_ticks: ready.clone(),
            });
            let addr = format!("0.0.0.0:{}", config.metrics_port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind metrics server on {}", addr))?;
            info!("Metrics server listening on {}", addr);
            let router = health::endpoint_router(endpoint_state);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, router).await {
                    error!("Metrics server stopped: {}", e);
                }
            });

            ready.store(true, Ordering::Relaxed);
            runner.serve(config.schedule_offset()).await;
        }
        Commands::RunOnce { at } => {
            let tick = at.unwrap_or_else(Utc::now);
            let report = runner.run_tick(tick).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.failed {
                anyhow::bail!("export for {} failed", tick);
            }
        }
    }

    Ok(())
}

fn build_job(config: &WorkerConfig) -> Result<ExtractionJob> {
    let source = PostgresRowSource::connect_lazy(
        &config.database_url,
        config.db_max_connections,
        ACQUIRE_TIMEOUT,
    )
    .context("Invalid DATABASE_URL")?;
    let sink = ObjectStoreSink::from_url(&config.destination_url)
        .with_context(|| format!("Invalid DESTINATION_URL {}", config.destination_url))?
        .with_mode(config.write_mode());

    Ok(ExtractionJob::new(
        config.job_spec(),
        Arc::new(source),
        Arc::new(sink),
    ))
}

//! Standalone daily report worker.
//!
//! Runs only the daily report trigger, for deployments where the HTTP server
//! is started with `REPORT_SCHEDULER=false`. Stops on Ctrl+C.

use std::env;
use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bid_report::config::AppConfig;
use bid_report::db::RepositoryFactory;
use bid_report::scheduler::{run_daily, DailySchedule};
use bid_report::services::{ReportJob, SmtpMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting bid report worker");

    let config = AppConfig::from_env()?;
    let repository = RepositoryFactory::from_env().await?;
    let job = Arc::new(ReportJob::new(
        repository,
        Arc::new(SmtpMailer::new(config.smtp.clone())),
        config.report.clone(),
    ));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_daily(job, DailySchedule::from(&config.schedule), shutdown).await;

    info!("Worker stopped");
    Ok(())
}

//! Background ingestion scheduler.
//!
//! Registers a one-shot run at startup plus a recurring run on a fixed
//! interval. Both go through the same [`IngestJob`], so a tick that lands
//! while a run is in flight is skipped.

use std::sync::Arc;
use std::time::Duration;

use cryptonews_ingest::{IngestError, IngestJob};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Running scheduler handle. Dropping it without [`IngestScheduler::shutdown`]
/// leaves jobs running until process exit.
pub struct IngestScheduler {
    scheduler: JobScheduler,
    job: Arc<IngestJob>,
}

impl IngestScheduler {
    /// Builds and starts the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
    /// a job cannot be registered, or the scheduler fails to start.
    pub async fn start(job: Arc<IngestJob>, interval: Duration) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        let startup = {
            let job = Arc::clone(&job);
            Job::new_one_shot_async(Duration::ZERO, move |_uuid, _lock| {
                let job = Arc::clone(&job);
                Box::pin(async move {
                    tracing::info!("scheduler: starting startup ingestion run");
                    run_scheduled(&job).await;
                })
            })?
        };
        scheduler.add(startup).await?;

        let recurring = {
            let job = Arc::clone(&job);
            Job::new_repeated_async(interval, move |_uuid, _lock| {
                let job = Arc::clone(&job);
                Box::pin(async move {
                    tracing::info!("scheduler: starting scheduled ingestion run");
                    run_scheduled(&job).await;
                })
            })?
        };
        scheduler.add(recurring).await?;

        scheduler.start().await?;
        tracing::info!(
            interval_secs = interval.as_secs(),
            "scheduler: ingestion jobs registered"
        );
        Ok(Self { scheduler, job })
    }

    /// Cancels any in-flight run and stops the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler fails to shut down.
    pub async fn shutdown(mut self) -> Result<(), JobSchedulerError> {
        if self.job.cancel() {
            tracing::info!("scheduler: cancelled in-flight ingestion run");
        }
        self.scheduler.shutdown().await?;
        tracing::info!("scheduler: stopped");
        Ok(())
    }
}

async fn run_scheduled(job: &IngestJob) {
    match job.run().await {
        Ok(report) => tracing::info!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            failed = report.failed,
            cancelled = report.cancelled,
            "scheduler: ingestion run complete"
        ),
        Err(IngestError::AlreadyRunning) => {
            tracing::info!("scheduler: previous ingestion run still in progress; skipping");
        }
        Err(e) => tracing::error!(error = %e, "scheduler: ingestion run failed"),
    }
}

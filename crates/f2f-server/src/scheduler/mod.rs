//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! shipment counter reconciliation job.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<f2f_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_shipment_reconcile_job(&scheduler, pool, &config.shipment_reconcile_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring shipment reconciliation job.
///
/// Every upcoming shipment (dated today or later) has its stored counters
/// recomputed from its member orders, repairing any drift left by writes
/// that bypassed the consolidation path. The schedule comes from
/// `F2F_SHIPMENT_RECONCILE_CRON` (default every 15 minutes).
async fn register_shipment_reconcile_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            run_shipment_reconcile(&pool, Utc::now().date_naive()).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered shipment_reconcile job");
    Ok(())
}

async fn run_shipment_reconcile(pool: &PgPool, from: NaiveDate) {
    match f2f_db::refresh_upcoming_shipments(pool, from).await {
        Ok(outcome) if outcome.failed > 0 => {
            tracing::warn!(
                refreshed = outcome.refreshed,
                failed = outcome.failed,
                "scheduler: shipment_reconcile finished with failures"
            );
        }
        Ok(outcome) => {
            tracing::debug!(
                refreshed = outcome.refreshed,
                "scheduler: shipment_reconcile complete"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: shipment_reconcile failed to list shipments");
        }
    }
}

//! Watch command: periodic reconciliation in the foreground.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use quickom_server::{Scheduler, SchedulerConfig};

use super::Context;
use crate::error::ClientResult;

/// Runs passes on the configured interval until Ctrl-C.
pub async fn run(ctx: &Context, interval_secs: Option<u64>) -> ClientResult<()> {
    let mut sync = ctx.config.sync_config()?;
    if let Some(secs) = interval_secs.filter(|s| *s > 0) {
        sync = sync.with_interval(Duration::from_secs(secs));
    }
    let reconciler = ctx.reconciler(ctx.provider()?);

    let scheduler = Scheduler::new(SchedulerConfig::new(sync.interval));
    let handle = scheduler.handle();
    let deadline = sync.deadline;

    info!(
        interval_secs = sync.interval.as_secs(),
        store = %ctx.config.store_path().display(),
        "watching"
    );

    let task = tokio::spawn(scheduler.run(move |cancel| {
        let reconciler = reconciler.clone();
        async move {
            let deadline = deadline.map(|d| Instant::now() + d);
            let report = reconciler
                .run(&cancel, deadline)
                .await
                .map_err(|e| e.to_string())?;
            info!(
                checked = report.checked,
                updated = report.updated,
                missing = report.missing,
                conflicts = report.conflicts,
                cancelled = report.cancelled,
                "pass finished"
            );
            Ok::<(), String>(())
        }
    }));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.stop();

    if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
        warn!("scheduler did not stop within 5 seconds");
    }
    Ok(())
}

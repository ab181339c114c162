//! One-shot reconciliation pass.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use quickom_server::ReconcileReport;

use super::Context;
use crate::error::ClientResult;

/// Runs one pass and prints the report as JSON.
///
/// Ctrl-C stops the pass before the next record.
pub async fn run(ctx: &Context, deadline_secs: Option<u64>) -> ClientResult<()> {
    let report = pass(ctx, deadline_secs).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn pass(ctx: &Context, deadline_secs: Option<u64>) -> ClientResult<ReconcileReport> {
    let sync = ctx.config.sync_config()?;
    let reconciler = ctx.reconciler(ctx.provider()?);

    let limit = match deadline_secs {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => sync.deadline,
    };
    let deadline = limit.map(|d| Instant::now() + d);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, finishing current record");
            interrupt.cancel();
        }
    });

    let result = reconciler.run(&cancel, deadline).await;
    listener.abort();
    Ok(result?)
}

//! Import command: past sessions from the usage reports.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use quickom_server::{MemoryUserDirectory, ReportImporter};

use super::Context;
use crate::error::{ClientError, ClientResult};

/// Imports sessions held between `from` and `to` and prints the summary.
pub async fn run(
    ctx: &Context,
    from: NaiveDate,
    to: Option<NaiveDate>,
    users: Vec<(String, i64)>,
) -> ClientResult<()> {
    let to = to.unwrap_or_else(|| Utc::now().date_naive());
    if to < from {
        return Err(ClientError::Usage(format!(
            "--to ({}) is before --from ({})",
            to, from
        )));
    }

    let importer = ReportImporter::new(
        ctx.provider()?,
        ctx.store.clone(),
        ctx.store.clone(),
        Arc::new(MemoryUserDirectory::new(users)),
    );
    let report = importer.import(from, to).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

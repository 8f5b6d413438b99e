use anyhow::{bail, Result};
use jobs::runner::process_recurring_transactions;
use sea_orm::Database;
use tracing::{error, info};

/// One-shot invocation of the recurring-transaction run, for external cron
/// setups. Exits non-zero only on a scan-level failure; individual template
/// failures are reported in the summary and retried on the next invocation.
pub async fn process_recurring(database_url: &str) -> Result<()> {
    let db = match Database::connect(database_url).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    let summary = process_recurring_transactions(&db).await;

    if !summary.success {
        bail!(
            "recurring run failed: {}",
            summary.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    info!(
        processed = summary.processed_count,
        failed = summary.failed_count,
        "recurring run complete"
    );
    Ok(())
}

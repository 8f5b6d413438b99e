//! Drives one full scan-and-materialize pass over the due set.

use chrono::{DateTime, Utc};
use common::RecurringRunSummary;
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::materializer::materialize;
use crate::scanner::DueTemplateScan;

/// Runs one recurring-transaction pass against the current clock.
pub async fn process_recurring_transactions(db: &DatabaseConnection) -> RecurringRunSummary {
    process_due_templates(db, Utc::now()).await
}

/// Runs one pass with an explicit "now", captured once for the whole scan.
///
/// Each due template is materialized independently; a failing template is
/// logged and counted without aborting the rest of the batch, and stays due
/// for the next run. Only a failure to read the due set itself marks the
/// whole run as failed.
pub async fn process_due_templates(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> RecurringRunSummary {
    let mut processed_count = 0u64;
    let mut failed_count = 0u64;
    let mut scan = DueTemplateScan::new(now);

    info!("starting recurring transaction run");

    loop {
        let batch = match scan.next_batch(db).await {
            Ok(batch) => batch,
            Err(e) => {
                error!("recurring scan failed: {e}");
                return RecurringRunSummary::scan_failed(
                    processed_count,
                    failed_count,
                    e.to_string(),
                );
            }
        };
        if batch.is_empty() {
            break;
        }

        for template in batch {
            match materialize(db, &template, now).await {
                Ok(_) => processed_count += 1,
                Err(e) => {
                    failed_count += 1;
                    warn!(template_id = template.id, "failed recurring transaction: {e}");
                }
            }
        }
    }

    info!(processed_count, failed_count, "recurring transaction run finished");

    RecurringRunSummary::completed(processed_count, failed_count)
}

use serde::{Deserialize, Serialize};

/// Outcome of one recurring-transaction run.
///
/// `success` reflects the scan itself, not the individual templates: a run
/// that failed some templates but finished the scan still reports
/// `success = true` with a non-zero `failed_count`. Only a run that could not
/// read the due set reports `success = false`, and its counts then cover just
/// the work that completed before the scan died.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurringRunSummary {
    pub success: bool,
    pub processed_count: u64,
    pub failed_count: u64,
    pub error: Option<String>,
}

impl RecurringRunSummary {
    pub fn completed(processed_count: u64, failed_count: u64) -> Self {
        Self {
            success: true,
            processed_count,
            failed_count,
            error: None,
        }
    }

    pub fn scan_failed(processed_count: u64, failed_count: u64, error: String) -> Self {
        Self {
            success: false,
            processed_count,
            failed_count,
            error: Some(error),
        }
    }
}

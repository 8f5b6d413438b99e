use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Filter on the transaction direction (mirrors the `type` column).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKindFilter {
    Income,
    Expense,
}

/// Filter on whether a row is a recurrence template or an ordinary ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringStatusFilter {
    Recurring,
    NonRecurring,
}

/// Optional criteria for listing a user's transactions.
/// Absent fields leave the corresponding dimension unfiltered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TransactionFilter {
    /// Substring match against title and category.
    pub keyword: Option<String>,
    pub kind: Option<TransactionKindFilter>,
    pub recurring_status: Option<RecurringStatusFilter>,
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        self.keyword.is_none() && self.kind.is_none() && self.recurring_status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_use_screaming_snake_case_on_the_wire() {
        let json = serde_json::to_string(&TransactionKindFilter::Income).unwrap();
        assert_eq!(json, "\"INCOME\"");

        let status: RecurringStatusFilter = serde_json::from_str("\"NON_RECURRING\"").unwrap();
        assert_eq!(status, RecurringStatusFilter::NonRecurring);
    }

    #[test]
    fn default_filter_is_empty() {
        assert!(TransactionFilter::default().is_empty());
        let filter = TransactionFilter {
            keyword: Some("rent".to_string()),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }
}

//! Common transport-layer types shared between the backend crates.
//! These structs mirror the query parameters and response payloads of the
//! HTTP handlers so the job crates can report through the same shapes
//! without depending on the web layer.

mod filter;
mod job;
mod pagination;

pub use filter::{RecurringStatusFilter, TransactionFilter, TransactionKindFilter};
pub use job::RecurringRunSummary;
pub use pagination::{Paginated, Pagination};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Normalized paging parameters. Page numbers are 1-based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: u64,
    pub page_number: u64,
}

impl Pagination {
    /// Build from raw query values, clamping out-of-range input instead of
    /// rejecting it.
    pub fn new(page_size: Option<u64>, page_number: Option<u64>) -> Self {
        Self {
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            page_number: page_number.unwrap_or(1).max(1),
        }
    }

    /// 0-based index expected by offset-style paginators.
    pub fn page_index(&self) -> u64 {
        self.page_number - 1
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the metadata needed to walk the rest.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page_number: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total_items: u64, total_pages: u64) -> Self {
        Self {
            items,
            page_number: pagination.page_number,
            page_size: pagination.page_size,
            total_items,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_values_are_absent() {
        let pagination = Pagination::new(None, None);
        assert_eq!(pagination.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(pagination.page_number, 1);
        assert_eq!(pagination.page_index(), 0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let pagination = Pagination::new(Some(0), Some(0));
        assert_eq!(pagination.page_size, 1);
        assert_eq!(pagination.page_number, 1);

        let pagination = Pagination::new(Some(10_000), Some(3));
        assert_eq!(pagination.page_size, MAX_PAGE_SIZE);
        assert_eq!(pagination.page_index(), 2);
    }
}

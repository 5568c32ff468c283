use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Page selection for user searches. Pages are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Filters {
    pub page: u32,
    pub page_size: u32,
}

impl Filters {
    #[must_use]
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub current_page: u32,
    pub page_size: u32,
    pub first_page: u32,
    pub last_page: u32,
    pub total_records: u64,
}

impl Metadata {
    /// Pagination summary for a result set; empty result sets yield all zeros.
    #[must_use]
    pub fn calculate(total_records: u64, filters: Filters) -> Self {
        if total_records == 0 || filters.page_size == 0 {
            return Self::default();
        }
        let last_page = total_records.div_ceil(u64::from(filters.page_size));
        Self {
            current_page: filters.page,
            page_size: filters.page_size,
            first_page: 1,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_and_offset_follow_page() {
        let filters = Filters::new(3, 20);
        assert_eq!(filters.limit(), 20);
        assert_eq!(filters.offset(), 40);
        assert_eq!(Filters::new(1, 10).offset(), 0);
    }

    #[test]
    fn metadata_empty_when_no_records() {
        assert_eq!(Metadata::calculate(0, Filters::new(1, 10)), Metadata::default());
    }

    #[test]
    fn metadata_rounds_last_page_up() {
        let metadata = Metadata::calculate(21, Filters::new(2, 10));
        assert_eq!(metadata.first_page, 1);
        assert_eq!(metadata.last_page, 3);
        assert_eq!(metadata.current_page, 2);
        assert_eq!(metadata.total_records, 21);

        let metadata = Metadata::calculate(20, Filters::new(1, 10));
        assert_eq!(metadata.last_page, 2);
    }
}

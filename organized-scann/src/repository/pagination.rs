//! Offset/limit window handed to the persistence gateway

/// Pagination parameters for repository queries
///
/// # Example
///
/// ```rust
/// use organized_scann::repository::Pagination;
///
/// let page3 = Pagination::page(3, 20); // Page 3 with 20 items per page
/// assert_eq!(page3.offset, 40); // Skip first 2 pages (40 items)
/// assert_eq!(page3.limit, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    /// Create new pagination parameters
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Create pagination for a specific page number (1-indexed)
    ///
    /// Page 0 is treated as page 1; the offset saturates instead of
    /// overflowing for absurd page numbers.
    #[must_use]
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        let offset = page_number.saturating_sub(1).saturating_mul(page_size);
        Self {
            offset,
            limit: page_size,
        }
    }

    /// Offset as a signed SQL parameter
    pub(crate) fn sql_offset(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    /// Limit as a signed SQL parameter
    pub(crate) fn sql_limit(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }

    /// Offset as a slice index
    pub(crate) fn skip(&self) -> usize {
        usize::try_from(self.offset).unwrap_or(usize::MAX)
    }

    /// Limit as a slice length
    pub(crate) fn take(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(usize::MAX)
    }
}

//! Pagination primitives shared by list queries.

use serde::{Deserialize, Serialize};

/// A window over a newest-first result set.
///
/// `limit: None` means "no limit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Every row, no window.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from 1-based page number and page size.
    pub fn numbered(page: u32, per_page: u32) -> Self {
        Self::new(per_page, page.saturating_sub(1).saturating_mul(per_page))
    }
}

/// One page of results plus the size of the unpaged result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_page() {
        assert_eq!(Page::numbered(1, 20), Page::new(20, 0));
        assert_eq!(Page::numbered(3, 20), Page::new(20, 40));
        assert_eq!(Page::numbered(0, 20), Page::new(20, 0));
    }
}

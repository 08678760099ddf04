//! Offset pagination: page/limit normalization and page metadata.

use serde::Serialize;

/// Default page size when the request does not name one.
pub const DEFAULT_PAGE_SIZE: u32 = 12;
/// Largest accepted page size; larger requests clamp down.
pub const MAX_PAGE_SIZE: u32 = 50;
/// Largest accepted page number; larger requests clamp down.
pub const MAX_PAGE: u32 = 100;

/// Normalized pagination request.
///
/// Out-of-range inputs clamp instead of erroring. A page beyond the last one
/// yields an empty item list with correct metadata, never a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageParams {
    page: u32,
    limit: u32,
}

impl PageParams {
    pub fn from_request(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip before this page starts.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::from_request(None, None)
    }
}

/// Page metadata attached to every listing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_count: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub page_size: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageMeta {
    pub fn compute(total_count: u64, params: PageParams) -> Self {
        let total_pages = total_count
            .div_ceil(u64::from(params.limit))
            .min(u64::from(u32::MAX)) as u32;

        Self {
            total_count,
            total_pages,
            current_page: params.page,
            page_size: params.limit,
            has_next_page: params.page < total_pages,
            has_previous_page: params.page > 1,
        }
    }
}

/// One page of results plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, meta: PageMeta) -> Self {
        Self { items, meta }
    }
}

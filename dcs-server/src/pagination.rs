//! Page arithmetic for item listings (100 rows per page)

use serde::{Deserialize, Serialize};

/// Page size for all paginated listings
pub const PAGE_SIZE: i64 = 100;

/// `?page=N` query parameter (1-indexed, defaults to the first page)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: i64,
}

fn first_page() -> i64 {
    1
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub total_pages: i64,
    pub total_results: i64,
    /// Offset for SQL LIMIT/OFFSET
    #[serde(skip)]
    pub offset: i64,
}

/// Clamp the requested page into `[1, total_pages]` and compute its offset
///
/// # Examples
/// ```
/// use dcs_server::pagination::calculate_pagination;
///
/// let p = calculate_pagination(250, 2);
/// assert_eq!((p.page, p.total_pages, p.offset), (2, 3, 100));
///
/// let p = calculate_pagination(250, 99);
/// assert_eq!((p.page, p.offset), (3, 200));
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.max(1).min(total_pages.max(1));

    Pagination {
        page,
        total_pages,
        total_results,
        offset: (page - 1) * PAGE_SIZE,
    }
}

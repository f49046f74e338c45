use serde::{Deserialize, Serialize};

/// Hard ceiling on a single page, whatever the caller asks for.
pub const MAX_PER_PAGE: u32 = 100;

/// Query parameters for paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number (default: 1).
    pub page: Option<u32>,

    /// Items per page (default: configured `per_page`, max: 100).
    pub per_page: Option<u32>,
}

/// One page of a listing plus the numbers needed to render pagination links.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: i64) -> Self {
        let last_page = if total <= 0 {
            1
        } else {
            ((total as u64).div_ceil(per_page.max(1) as u64)) as u32
        };

        Self {
            items,
            page,
            per_page,
            total,
            last_page,
        }
    }
}

/// Normalises `(page_size, page_number)` into `(per_page, page, offset)`.
/// Zero means "use the default" for the size and "first page" for the number.
pub fn window(page_size: u32, page_number: u32, default_size: u32) -> (u32, u32, i64) {
    let per_page = match page_size {
        0 => default_size.max(1),
        n => n,
    }
    .min(MAX_PER_PAGE);
    let page = page_number.max(1);
    let offset = (page as i64 - 1) * per_page as i64;
    (per_page, page, offset)
}

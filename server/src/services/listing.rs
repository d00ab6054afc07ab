//! Pagination and search helpers for list endpoints.

use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: u32 = 100;

/// `?search=&page=&per_page=` as sent by the dashboard list screens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub per_page: u32,
}

impl PageWindow {
    /// Clamp a requested window: page starts at 1, `per_page` stays within `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn resolve(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(default_per_page)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.per_page)
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

/// Page envelope; the dashboard reads `items` and `pages`.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub pages: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, window: PageWindow) -> Self {
        Self { items, total, page: window.page, per_page: window.per_page, pages: page_count(total, window.per_page) }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            pages: self.pages,
        }
    }
}

#[must_use]
pub fn page_count(total: i64, per_page: u32) -> i64 {
    if total <= 0 {
        return 0;
    }
    let per_page = i64::from(per_page.max(1));
    (total + per_page - 1) / per_page
}

/// Build an `ILIKE` substring pattern, escaping the LIKE metacharacters.
/// Blank searches return `None` so callers can skip the filter.
#[must_use]
pub fn like_pattern(search: Option<&str>) -> Option<String> {
    let trimmed = search?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(trimmed.len() + 2);
    escaped.push('%');
    for c in trimmed.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

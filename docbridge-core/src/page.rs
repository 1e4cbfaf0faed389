//! Page-number pagination on top of limit/offset queries.
//!
//! [`PaginationParams`] turns a 1-indexed page number into `limit` and `offset`
//! tokens; [`Page`] carries one page of decoded documents together with the
//! backend's total so callers can render "next" and "previous" links.

use serde::{Deserialize, Serialize};

use crate::query::Query;

/// One page of documents.
///
/// # Example
///
/// ```ignore
/// let page = tasks.page(PaginationParams::new(2, 10), vec![]).await?;
///
/// println!("{} of {} tasks", page.items.len(), page.count);
/// if let Some(next) = page.next_page {
///     println!("more on page {next}");
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The documents on this page.
    pub items: Vec<T>,
    /// Number of matching documents across all pages.
    pub count: usize,
    /// The next page number, if more documents follow.
    pub next_page: Option<usize>,
    /// The previous page number, unless this is the first page.
    pub previous_page: Option<usize>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

/// Which page to fetch and how large pages are. Pages are 1-indexed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of documents per page.
    pub per_page: usize,
}

impl PaginationParams {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// Number of documents to skip to reach this page.
    ///
    /// Page `0` is treated like page `1`. Saturates at `usize::MAX`.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// Returns the `limit` and `offset` tokens that select this page.
    pub fn queries(&self) -> [Query; 2] {
        [Query::Limit(self.per_page), Query::Offset(self.offset())]
    }

    /// Wraps the items fetched with [`queries`](Self::queries) into a [`Page`].
    ///
    /// `total` is the number of matching documents across all pages, as
    /// reported by the backend.
    pub fn to_page<T>(&self, items: Vec<T>, total: usize) -> Page<T> {
        let end = self.offset().saturating_add(items.len());

        Page {
            items,
            count: total,
            next_page: (end < total).then_some(self.page.max(1).saturating_add(1)),
            previous_page: (self.page > 1).then_some(self.page - 1),
        }
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 25 }
    }
}

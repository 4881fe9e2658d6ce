//! Offset pagination envelope returned by listing queries.

use serde::Serialize;

/// One page of results plus derived navigation flags.
///
/// Fields are private so the flags can only come from [`PageEnvelope::of`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageEnvelope<T> {
    content: Vec<T>,
    page: u32,
    size: u32,
    total_elements: u64,
    total_pages: u64,
    is_first: bool,
    is_last: bool,
    is_empty: bool,
}

impl<T> PageEnvelope<T> {
    /// Builds the envelope; a `size` of zero is replaced by `default_size`.
    pub fn of(content: Vec<T>, page: u32, size: u32, total_elements: u64, default_size: u32) -> Self {
        let size = if size == 0 { default_size.max(1) } else { size };
        let total_pages = total_elements.div_ceil(u64::from(size));
        let is_first = page == 0;
        let is_last = u64::from(page) + 1 >= total_pages;
        let is_empty = content.is_empty();

        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
            is_first,
            is_last,
            is_empty,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn is_first(&self) -> bool {
        self.is_first
    }

    pub fn is_last(&self) -> bool {
        self.is_last
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageEnvelope<U> {
        PageEnvelope {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            is_first: self.is_first,
            is_last: self.is_last,
            is_empty: self.is_empty,
        }
    }
}

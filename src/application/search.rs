//! Canonical listing request shared by every entry point.

use serde::{Deserialize, Serialize};

use crate::application::sort::SortMode;
use crate::domain::types::SortDirection;

/// Page size of the cached default listing.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub page: u32,
    /// `0` falls back to the default size.
    pub size: u32,
    pub keyword: Option<String>,
    pub sites: Vec<String>,
    pub category_id: Option<i64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<String>,
    pub direction: Option<SortDirection>,
}

/// Reasons a request cannot be answered from the default listing cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultViewViolation {
    NotFirstPage,
    NonDefaultSize,
    Keyword,
    Sites,
    Category,
    MinPrice,
    MaxPrice,
    SortMode,
    Direction,
}

impl SearchRequest {
    /// First page of the unfiltered, newest-first listing.
    pub fn default_view(page_size: u32) -> Self {
        Self {
            size: page_size,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u32, size: u32) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_sites<I, S>(mut self, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sites = sites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_price_range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn effective_size(&self, default_size: u32) -> u32 {
        if self.size == 0 {
            default_size
        } else {
            self.size
        }
    }

    /// Trimmed keyword, `None` when absent or blank.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
    }

    pub fn sort_mode(&self) -> SortMode {
        SortMode::parse(self.sort_by.as_deref())
    }

    /// Every rule this request breaks for default-view eligibility.
    ///
    /// The request is eligible exactly when the list is empty.
    pub fn default_view_violations(&self, default_size: u32) -> Vec<DefaultViewViolation> {
        let mut violations = Vec::new();

        if self.page != 0 {
            violations.push(DefaultViewViolation::NotFirstPage);
        }
        if self.effective_size(default_size) != default_size {
            violations.push(DefaultViewViolation::NonDefaultSize);
        }
        if self.keyword().is_some() {
            violations.push(DefaultViewViolation::Keyword);
        }
        if !self.sites.is_empty() {
            violations.push(DefaultViewViolation::Sites);
        }
        if self.category_id.is_some() {
            violations.push(DefaultViewViolation::Category);
        }
        if self.min_price.is_some() {
            violations.push(DefaultViewViolation::MinPrice);
        }
        if self.max_price.is_some() {
            violations.push(DefaultViewViolation::MaxPrice);
        }
        if self.sort_mode() != SortMode::Latest {
            violations.push(DefaultViewViolation::SortMode);
        }
        if matches!(self.direction, Some(SortDirection::Asc)) {
            violations.push(DefaultViewViolation::Direction);
        }

        violations
    }

    pub fn is_default_view(&self, default_size: u32) -> bool {
        self.default_view_violations(default_size).is_empty()
    }
}

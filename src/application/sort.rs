//! Sort-mode resolution for deal listings.

use std::cmp::Ordering;

use tracing::debug;

use crate::domain::entities::DealRecord;
use crate::domain::types::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Latest,
    Popular,
    LowPrice,
    HighPrice,
}

impl SortMode {
    /// Unknown or missing tokens resolve to [`SortMode::Latest`].
    pub fn parse(token: Option<&str>) -> Self {
        let Some(raw) = token.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return SortMode::Latest;
        };

        match raw {
            "latest" => SortMode::Latest,
            "popular" => SortMode::Popular,
            "lowPrice" => SortMode::LowPrice,
            "highPrice" => SortMode::HighPrice,
            other => {
                debug!(
                    target = "application::sort",
                    token = other,
                    "unrecognized sort token, using latest"
                );
                SortMode::Latest
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Latest => "latest",
            SortMode::Popular => "popular",
            SortMode::LowPrice => "lowPrice",
            SortMode::HighPrice => "highPrice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    LikeCount,
    CommentCount,
    Price,
    Id,
}

impl SortKey {
    pub fn column(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::LikeCount => "like_count",
            SortKey::CommentCount => "comment_count",
            SortKey::Price => "price",
            SortKey::Id => "id",
        }
    }
}

/// Ordered sort keys; always ends with `id desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealOrdering {
    keys: Vec<(SortKey, SortDirection)>,
}

impl DealOrdering {
    fn from_keys(mut keys: Vec<(SortKey, SortDirection)>) -> Self {
        keys.push((SortKey::Id, SortDirection::Desc));
        Self { keys }
    }

    /// `direction` replaces the direction of the primary key only.
    pub fn resolve(mode: SortMode, direction: Option<SortDirection>) -> Self {
        let mut keys = match mode {
            SortMode::Latest => vec![(SortKey::CreatedAt, SortDirection::Desc)],
            SortMode::Popular => vec![
                (SortKey::LikeCount, SortDirection::Desc),
                (SortKey::CreatedAt, SortDirection::Desc),
            ],
            SortMode::LowPrice => vec![(SortKey::Price, SortDirection::Asc)],
            SortMode::HighPrice => vec![(SortKey::Price, SortDirection::Desc)],
        };
        if let (Some(direction), Some(primary)) = (direction, keys.first_mut()) {
            primary.1 = direction;
        }
        Self::from_keys(keys)
    }

    pub fn latest() -> Self {
        Self::resolve(SortMode::Latest, None)
    }

    pub fn most_liked() -> Self {
        Self::resolve(SortMode::Popular, None)
    }

    pub fn most_commented() -> Self {
        Self::from_keys(vec![
            (SortKey::CommentCount, SortDirection::Desc),
            (SortKey::CreatedAt, SortDirection::Desc),
        ])
    }

    pub fn keys(&self) -> &[(SortKey, SortDirection)] {
        &self.keys
    }

    /// In-memory comparison consistent with the SQL `ORDER BY`.
    pub fn compare(&self, left: &DealRecord, right: &DealRecord) -> Ordering {
        for (key, direction) in &self.keys {
            let ordering = match key {
                SortKey::CreatedAt => left.created_at.cmp(&right.created_at),
                SortKey::LikeCount => left.like_count.cmp(&right.like_count),
                SortKey::CommentCount => left.comment_count.cmp(&right.comment_count),
                SortKey::Price => left.price.cmp(&right.price),
                SortKey::Id => left.id.cmp(&right.id),
            };
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

//! Shared domain enumerations.

use serde::{Deserialize, Serialize};

/// Derived counters stored on a deal and mutated only through signed deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    View,
    Like,
    Comment,
}

impl CounterField {
    /// Column backing the counter in the `sales` table.
    pub fn column(self) -> &'static str {
        match self {
            CounterField::View => "view_count",
            CounterField::Like => "like_count",
            CounterField::Comment => "comment_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Lenient parse used for query strings; anything unknown yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Source sites the crawlers currently post from.
///
/// The stored tag stays a free-form string so new crawlers do not need a
/// schema change; this list only provides display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownSite {
    Ppomppu,
    Ruliweb,
    Arcalive,
    Fmkorea,
    Quasarzone,
    Eomisae,
}

impl KnownSite {
    pub const ALL: [KnownSite; 6] = [
        KnownSite::Ppomppu,
        KnownSite::Ruliweb,
        KnownSite::Arcalive,
        KnownSite::Fmkorea,
        KnownSite::Quasarzone,
        KnownSite::Eomisae,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            KnownSite::Ppomppu => "ppomppu",
            KnownSite::Ruliweb => "ruliweb",
            KnownSite::Arcalive => "arcalive",
            KnownSite::Fmkorea => "fmkorea",
            KnownSite::Quasarzone => "quasarzone",
            KnownSite::Eomisae => "eomisae",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            KnownSite::Ppomppu => "뽐뿌",
            KnownSite::Ruliweb => "루리웹",
            KnownSite::Arcalive => "아카라이브",
            KnownSite::Fmkorea => "에펨코리아",
            KnownSite::Quasarzone => "퀘이사존",
            KnownSite::Eomisae => "어미새",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|site| site.tag() == normalized.as_str())
    }
}

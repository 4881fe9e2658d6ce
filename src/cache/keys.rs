//! Cache key definitions.
//!
//! Keys are plain strings so every backend sees the same layout.

use std::fmt;

use uuid::Uuid;

/// Matches every listing entry regardless of page size.
pub const LIST_KEY_PATTERN: &str = "sale:list:*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// First page of the unfiltered newest-first listing.
    DefaultList { page_size: u32 },
    /// Summary of a single deal.
    DealDetail(Uuid),
}

impl CacheKey {
    pub fn default_list(page_size: u32) -> Self {
        Self::DefaultList { page_size }
    }

    pub fn deal_detail(id: Uuid) -> Self {
        Self::DealDetail(id)
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::DefaultList { page_size } => write!(f, "sale:list:latest:{page_size}"),
            CacheKey::DealDetail(id) => write!(f, "sale:id:{id}"),
        }
    }
}

/// Glob match supporting `*` (any run) and `?` (one char), as Redis `MATCH` does.
pub(crate) fn glob_matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
            }
            Some('?') => {
                p += 1;
                k += 1;
            }
            Some(ch) if *ch == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    k = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}

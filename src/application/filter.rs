//! Composable listing predicates built from a [`SearchRequest`].

use time::OffsetDateTime;

use crate::application::search::SearchRequest;
use crate::domain::entities::DealRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Case-insensitive substring match on the title.
    TitleContains(String),
    /// Source site is any of the listed tags.
    SourceSiteIn(Vec<String>),
    CategoryIs(i64),
    PriceAtLeast(i64),
    PriceAtMost(i64),
    CreatedSince(OffsetDateTime),
}

impl Clause {
    pub fn matches(&self, deal: &DealRecord) -> bool {
        match self {
            Clause::TitleContains(needle) => deal
                .title
                .to_lowercase()
                .contains(needle.to_lowercase().as_str()),
            Clause::SourceSiteIn(sites) => sites.iter().any(|site| *site == deal.source_site),
            Clause::CategoryIs(id) => deal.category.as_ref().is_some_and(|c| c.id == *id),
            Clause::PriceAtLeast(min) => deal.price >= *min,
            Clause::PriceAtMost(max) => deal.price <= *max,
            Clause::CreatedSince(since) => deal.created_at >= *since,
        }
    }
}

/// Conjunction of clauses. The empty predicate matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealPredicate {
    clauses: Vec<Clause>,
}

impl DealPredicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Appends the clause when present.
    pub fn and_maybe(self, clause: Option<Clause>) -> Self {
        match clause {
            Some(clause) => self.and(clause),
            None => self,
        }
    }

    pub fn compile(request: &SearchRequest) -> Self {
        let sites: Vec<String> = request
            .sites
            .iter()
            .map(|site| site.trim().to_ascii_lowercase())
            .filter(|site| !site.is_empty())
            .collect();

        [
            request
                .keyword()
                .map(|keyword| Clause::TitleContains(keyword.to_string())),
            (!sites.is_empty()).then(|| Clause::SourceSiteIn(sites)),
            request.category_id.map(Clause::CategoryIs),
            request.min_price.map(Clause::PriceAtLeast),
            request.max_price.map(Clause::PriceAtMost),
        ]
        .into_iter()
        .fold(Self::all(), Self::and_maybe)
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, deal: &DealRecord) -> bool {
        self.clauses.iter().all(|clause| clause.matches(deal))
    }
}

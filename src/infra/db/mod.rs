//! Postgres-backed repository implementations.

mod comments;
mod deals;
mod likes;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::filter::{Clause, DealPredicate};
use crate::application::sort::DealOrdering;

/// Projection shared by every deal read; `s` is `sales`, `c` is `categories`.
const DEAL_COLUMNS: &str = "s.id, s.title, s.price, s.store_name, s.product_url, s.image_url, \
    s.source_site, s.category_id, c.name AS category_name, s.view_count, s.like_count, \
    s.comment_count, s.is_active, s.created_at, s.updated_at";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Appends one ` AND ...` per clause; callers start from `WHERE 1=1`.
    pub(crate) fn apply_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &DealPredicate) {
        for clause in predicate.clauses() {
            match clause {
                Clause::TitleContains(needle) => {
                    qb.push(" AND s.title ILIKE ");
                    qb.push_bind(format!("%{}%", util::escape_like(needle)));
                }
                Clause::SourceSiteIn(sites) => {
                    qb.push(" AND s.source_site = ANY(");
                    qb.push_bind(sites.clone());
                    qb.push(")");
                }
                Clause::CategoryIs(id) => {
                    qb.push(" AND s.category_id = ");
                    qb.push_bind(*id);
                }
                Clause::PriceAtLeast(min) => {
                    qb.push(" AND s.price >= ");
                    qb.push_bind(*min);
                }
                Clause::PriceAtMost(max) => {
                    qb.push(" AND s.price <= ");
                    qb.push_bind(*max);
                }
                Clause::CreatedSince(since) => {
                    qb.push(" AND s.created_at >= ");
                    qb.push_bind(*since);
                }
            }
        }
    }

    pub(crate) fn push_ordering(qb: &mut QueryBuilder<'_, Postgres>, ordering: &DealOrdering) {
        qb.push(" ORDER BY ");
        for (index, (key, direction)) in ordering.keys().iter().enumerate() {
            if index > 0 {
                qb.push(", ");
            }
            qb.push("s.");
            qb.push(key.column());
            qb.push(" ");
            qb.push(direction.as_sql());
        }
    }
}

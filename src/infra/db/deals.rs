use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::filter::DealPredicate,
    application::repos::{DealsRepo, PageWindow, RepoError, StorePage},
    application::sort::DealOrdering,
    domain::entities::{CategoryRef, DealRecord, NewDeal},
    domain::types::CounterField,
};

use super::util::{convert_count, map_sqlx_error};
use super::{DEAL_COLUMNS, PostgresRepositories};

#[derive(sqlx::FromRow)]
struct DealRow {
    id: Uuid,
    title: String,
    price: i64,
    store_name: Option<String>,
    product_url: String,
    image_url: Option<String>,
    source_site: String,
    category_id: Option<i64>,
    category_name: Option<String>,
    view_count: i64,
    like_count: i64,
    comment_count: i64,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<DealRow> for DealRecord {
    fn from(row: DealRow) -> Self {
        let category = row.category_id.map(|id| CategoryRef {
            id,
            name: row.category_name.unwrap_or_default(),
        });

        Self {
            id: row.id,
            title: row.title,
            price: row.price,
            store_name: row.store_name,
            product_url: row.product_url,
            image_url: row.image_url,
            source_site: row.source_site,
            category,
            view_count: row.view_count,
            like_count: row.like_count,
            comment_count: row.comment_count,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    /// Runs a single-row `UPDATE`/`INSERT ... RETURNING *` and re-reads it with
    /// the category join.
    async fn fetch_mutated(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
    ) -> Result<Option<DealRecord>, RepoError> {
        qb.push(") SELECT ");
        qb.push(DEAL_COLUMNS);
        qb.push(" FROM changed s LEFT JOIN categories c ON c.id = s.category_id");

        let row = qb
            .build_query_as::<DealRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(DealRecord::from))
    }

    async fn find_one(
        &self,
        column: &'static str,
        value: DealLookup<'_>,
    ) -> Result<Option<DealRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(DEAL_COLUMNS);
        qb.push(" FROM sales s LEFT JOIN categories c ON c.id = s.category_id WHERE s.");
        qb.push(column);
        qb.push(" = ");
        match value {
            DealLookup::Id(id) => qb.push_bind(id),
            DealLookup::Url(url) => qb.push_bind(url.to_string()),
        };

        let row = qb
            .build_query_as::<DealRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(DealRecord::from))
    }
}

enum DealLookup<'a> {
    Id(Uuid),
    Url(&'a str),
}

#[async_trait]
impl DealsRepo for PostgresRepositories {
    async fn find(
        &self,
        predicate: &DealPredicate,
        ordering: &DealOrdering,
        window: PageWindow,
    ) -> Result<StorePage<DealRecord>, RepoError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM sales s WHERE 1=1");
        Self::apply_predicate(&mut count_qb, predicate);
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let limit = i64::from(window.size.max(1));
        let offset = i64::try_from(window.offset())
            .map_err(|_| RepoError::InvalidInput {
                message: "page offset out of range".to_string(),
            })?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(DEAL_COLUMNS);
        qb.push(" FROM sales s LEFT JOIN categories c ON c.id = s.category_id WHERE 1=1");
        Self::apply_predicate(&mut qb, predicate);
        Self::push_ordering(&mut qb, ordering);
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<DealRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(StorePage {
            items: rows.into_iter().map(DealRecord::from).collect(),
            total: convert_count(total)?,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DealRecord>, RepoError> {
        self.find_one("id", DealLookup::Id(id)).await
    }

    async fn find_by_product_url(
        &self,
        product_url: &str,
    ) -> Result<Option<DealRecord>, RepoError> {
        self.find_one("product_url", DealLookup::Url(product_url))
            .await
    }

    async fn insert(&self, deal: NewDeal) -> Result<DealRecord, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "WITH changed AS (INSERT INTO sales \
             (id, title, price, store_name, product_url, image_url, source_site, category_id) \
             VALUES (",
        );
        let mut values = qb.separated(", ");
        values.push_bind(Uuid::new_v4());
        values.push_bind(deal.title);
        values.push_bind(deal.price);
        values.push_bind(deal.store_name);
        values.push_bind(deal.product_url);
        values.push_bind(deal.image_url);
        values.push_bind(deal.source_site);
        values.push_bind(deal.category_id);
        qb.push(") RETURNING *");

        self.fetch_mutated(qb)
            .await?
            .ok_or_else(|| RepoError::from_persistence("insert returned no row"))
    }

    async fn update_counter_delta(
        &self,
        id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> Result<DealRecord, RepoError> {
        let column = field.column();
        let mut qb = QueryBuilder::<Postgres>::new("WITH changed AS (UPDATE sales SET ");
        qb.push(column);
        qb.push(" = GREATEST(");
        qb.push(column);
        qb.push(" + ");
        qb.push_bind(delta);
        qb.push(", 0), updated_at = now() WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING *");

        self.fetch_mutated(qb).await?.ok_or(RepoError::NotFound)
    }

    async fn count(&self) -> Result<u64, RepoError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(total)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<DealRecord, RepoError> {
        let mut qb =
            QueryBuilder::<Postgres>::new("WITH changed AS (UPDATE sales SET is_active = ");
        qb.push_bind(active);
        qb.push(", updated_at = now() WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING *");

        self.fetch_mutated(qb).await?.ok_or(RepoError::NotFound)
    }
}

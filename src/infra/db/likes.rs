use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{LikesRepo, RepoError},
    domain::entities::UserId,
};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[async_trait]
impl LikesRepo for PostgresRepositories {
    async fn exists(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sale_likes WHERE sale_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(deal_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn add_like(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO sale_likes (sale_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (sale_id, user_id) DO NOTHING
            "#,
        )
        .bind(deal_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected()
            == 1;

        if inserted {
            sqlx::query(
                r#"
                UPDATE sales
                SET like_count = like_count + 1, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(deal_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(inserted)
    }

    async fn remove_like(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let removed = sqlx::query(
            r#"
            DELETE FROM sale_likes
            WHERE sale_id = $1 AND user_id = $2
            "#,
        )
        .bind(deal_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected()
            == 1;

        if removed {
            sqlx::query(
                r#"
                UPDATE sales
                SET like_count = GREATEST(like_count - 1, 0), updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(deal_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(removed)
    }
}

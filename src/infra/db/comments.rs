use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CommentsRepo, RepoError},
    domain::entities::{CommentRecord, NewComment},
};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    sale_id: Uuid,
    user_id: i64,
    parent_id: Option<Uuid>,
    content: String,
    is_deleted: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            deal_id: row.sale_id,
            user_id: row.user_id,
            parent_id: row.parent_id,
            content: row.content,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn insert(&self, comment: NewComment) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, sale_id, user_id, parent_id, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, sale_id, user_id, parent_id, content, is_deleted, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(comment.deal_id)
        .bind(comment.user_id)
        .bind(comment.parent_id)
        .bind(comment.content)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, sale_id, user_id, parent_id, content, is_deleted, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CommentRecord::from))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE comments
            SET is_deleted = TRUE, updated_at = now()
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_deal(&self, deal_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, sale_id, user_id, parent_id, content, is_deleted, created_at, updated_at
            FROM comments
            WHERE sale_id = $1 AND NOT is_deleted
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(deal_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }
}

use async_trait::async_trait;
use sqlx::PgPool;

use super::SubscriberStore;
use crate::error::AppError;

/// PostgreSQL-backed subscriber set.
pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    async fn create(&self, chat_id: i64) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO subscribers (chat_id) VALUES ($1) ON CONFLICT (chat_id) DO NOTHING",
        )
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, chat_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM subscribers WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn exists(&self, chat_id: i64) -> Result<bool, AppError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT chat_id FROM subscribers WHERE chat_id = $1")
                .bind(chat_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn list_all(&self) -> Result<Vec<i64>, AppError> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT chat_id FROM subscribers")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(chat_id,)| chat_id).collect())
    }
}

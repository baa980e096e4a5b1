use async_trait::async_trait;
use sqlx::PgPool;

use super::WatermarkStore;
use crate::error::AppError;

/// Key under which the last announced item id is stored.
const LAST_ANNOUNCED_KEY: &str = "last_announced";

/// PostgreSQL-backed watermark store.
pub struct PgWatermarkStore {
    pool: PgPool,
}

impl PgWatermarkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkStore for PgWatermarkStore {
    async fn get_last_id(&self) -> Result<Option<String>, AppError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM watcher_state WHERE key = $1")
                .bind(LAST_ANNOUNCED_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_last_id(&self, id: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO watcher_state (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            "#,
        )
        .bind(LAST_ANNOUNCED_KEY)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

//! Durable state for the watch-and-broadcast pipeline.
//!
//! Two small stores, both behind traits so the pipeline can run against
//! in-memory fakes in tests: the subscriber set (chat ids, negative for
//! groups) and the single-value watcher state holding the id of the last
//! announced item.

mod state;
mod subscribers;

pub use state::PgWatermarkStore;
pub use subscribers::PgSubscriberStore;

use async_trait::async_trait;

use crate::error::AppError;

/// Durable set of subscribed chat ids.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Register a chat. Registering an id that already exists is a no-op.
    async fn create(&self, chat_id: i64) -> Result<(), AppError>;

    /// Remove a chat. Removing an unknown id is a no-op.
    async fn delete(&self, chat_id: i64) -> Result<(), AppError>;

    async fn exists(&self, chat_id: i64) -> Result<bool, AppError>;

    /// Every subscribed chat id, in no particular order.
    async fn list_all(&self) -> Result<Vec<i64>, AppError>;
}

/// Durable watermark: the id of the most recently announced item.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn get_last_id(&self) -> Result<Option<String>, AppError>;

    async fn set_last_id(&self, id: &str) -> Result<(), AppError>;
}

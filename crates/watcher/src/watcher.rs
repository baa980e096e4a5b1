//! The check cycle and the scheduler loop driving it.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use breakwire_common::error::AppError;
use breakwire_common::store::{SubscriberStore, WatermarkStore};

use crate::broadcast::{BroadcastReport, Broadcaster, Courier};
use crate::feed::{FeedError, FeedSource};
use crate::format;
use crate::gate::{self, Verdict};

/// Errors that abort a single check cycle. None of them stop the watcher;
/// the next tick retries from scratch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Invalid breaking news item {id:?}: missing required fields")]
    InvalidItem { id: String },

    #[error(transparent)]
    Store(#[from] AppError),
}

/// How one check cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    NoNews,
    NotBreaking,
    AlreadyAnnounced,
    Announced(BroadcastReport),
}

/// Drives fetch, gate, render, broadcast and watermark update on a fixed
/// cadence.
pub struct NewsWatcher {
    feed: Arc<dyn FeedSource>,
    courier: Arc<dyn Courier>,
    subscribers: Arc<dyn SubscriberStore>,
    watermark: Arc<dyn WatermarkStore>,
    site_origin: String,
    check_interval: Duration,
}

impl NewsWatcher {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        courier: Arc<dyn Courier>,
        subscribers: Arc<dyn SubscriberStore>,
        watermark: Arc<dyn WatermarkStore>,
        site_origin: String,
        check_interval: Duration,
    ) -> Self {
        Self {
            feed,
            courier,
            subscribers,
            watermark,
            site_origin,
            check_interval,
        }
    }

    /// Run check cycles until shutdown is signalled.
    ///
    /// The delay is measured from cycle completion, so cycles never overlap
    /// and a slow broadcast stretches the effective period. Shutdown is
    /// observed between cycles; a cycle already in flight finishes first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.check_interval.as_secs(),
            "News watcher started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = shutdown.changed() => break,
            }

            if let Err(err) = self.check().await {
                tracing::error!(error = %err, "Check cycle failed");
            }
        }

        tracing::info!("News watcher stopped");
    }

    /// One fetch, gate, broadcast and watermark pass.
    pub async fn check(&self) -> Result<CycleOutcome, WatchError> {
        tracing::debug!("Checking feed for breaking news");

        let watermark = self.watermark.get_last_id().await?;
        let candidate = self.feed.fetch_latest().await?;

        match gate::evaluate(watermark.as_deref(), candidate) {
            Verdict::NoNews => {
                tracing::debug!("Feed has no current item");
                Ok(CycleOutcome::NoNews)
            }
            Verdict::NotBreaking => {
                tracing::debug!("Latest item is not breaking news");
                Ok(CycleOutcome::NotBreaking)
            }
            Verdict::AlreadyAnnounced => {
                tracing::debug!("Latest item was already announced");
                Ok(CycleOutcome::AlreadyAnnounced)
            }
            Verdict::Invalid { id } => Err(WatchError::InvalidItem { id }),
            Verdict::NewBreakingNews(item) => {
                tracing::info!(id = %item.id, headline = %item.headline, "New breaking news");

                let bulletin = format::render(&item, &self.site_origin);
                let recipients = self.subscribers.list_all().await?;
                let report = Broadcaster::new(self.courier.as_ref(), self.subscribers.as_ref())
                    .broadcast(&bulletin, &recipients)
                    .await;

                // The watermark moves only after the full fan-out; a crash
                // mid-broadcast re-announces on the next cycle rather than
                // silently dropping the item.
                self.watermark.set_last_id(&item.id).await?;

                tracing::info!(
                    id = %item.id,
                    recipients = recipients.len(),
                    delivered = report.delivered,
                    removed = report.removed,
                    migrated = report.migrated,
                    failed = report.failed,
                    "Broadcast complete"
                );
                Ok(CycleOutcome::Announced(report))
            }
        }
    }
}

//! End-to-end cycle tests: feed in, messages out, watermark moved.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::watch;

use common::{MemorySubscribers, RecordingCourier};

use breakwire_common::error::AppError;
use breakwire_common::store::WatermarkStore;
use breakwire_watcher::broadcast::DeliveryOutcome;
use breakwire_watcher::feed::{FeedError, FeedSource, NewsCandidate};
use breakwire_watcher::{CycleOutcome, NewsWatcher, WatchError};

const ORIGIN: &str = "https://news.example.org";

fn breaking_item(id: &str) -> NewsCandidate {
    NewsCandidate {
        id: id.to_string(),
        headline: "Quake hits coast".to_string(),
        text: "Buildings shook for a minute.".to_string(),
        url: format!("/articles/{id}.html"),
        date: "2024-05-02T14:33:07.000+02:00".to_string(),
        breaking: true,
    }
}

/// Feed stub returning the same response every cycle.
struct FixedFeed {
    response: Option<NewsCandidate>,
}

#[async_trait]
impl FeedSource for FixedFeed {
    async fn fetch_latest(&self) -> Result<Option<NewsCandidate>, FeedError> {
        Ok(self.response.clone())
    }
}

/// Feed stub failing every fetch.
struct FailingFeed;

#[async_trait]
impl FeedSource for FailingFeed {
    async fn fetch_latest(&self) -> Result<Option<NewsCandidate>, FeedError> {
        Err(FeedError::Status(StatusCode::SERVICE_UNAVAILABLE))
    }
}

/// In-memory watermark store.
#[derive(Default)]
struct MemoryWatermark {
    last: Mutex<Option<String>>,
}

impl MemoryWatermark {
    fn with(id: &str) -> Self {
        Self {
            last: Mutex::new(Some(id.to_string())),
        }
    }

    fn current(&self) -> Option<String> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermark {
    async fn get_last_id(&self) -> Result<Option<String>, AppError> {
        Ok(self.current())
    }

    async fn set_last_id(&self, id: &str) -> Result<(), AppError> {
        *self.last.lock().unwrap() = Some(id.to_string());
        Ok(())
    }
}

fn make_watcher(
    feed: Arc<dyn FeedSource>,
    courier: Arc<RecordingCourier>,
    subscribers: Arc<MemorySubscribers>,
    watermark: Arc<MemoryWatermark>,
) -> NewsWatcher {
    NewsWatcher::new(
        feed,
        courier,
        subscribers,
        watermark,
        ORIGIN.to_string(),
        Duration::from_millis(10),
    )
}

#[tokio::test]
async fn test_new_breaking_item_is_announced_to_all() {
    let courier = Arc::new(RecordingCourier::default());
    let subscribers = Arc::new(MemorySubscribers::with(&[-100, 7]));
    let watermark = Arc::new(MemoryWatermark::default());
    let feed = Arc::new(FixedFeed {
        response: Some(breaking_item("news-42")),
    });
    let watcher = make_watcher(feed, courier.clone(), subscribers, watermark.clone());

    let outcome = watcher.check().await.unwrap();

    let CycleOutcome::Announced(report) = outcome else {
        panic!("expected an announcement");
    };
    assert_eq!(report.delivered, 2);
    assert_eq!(watermark.current(), Some("news-42".to_string()));

    let to_group = courier.sent_to(-100);
    assert_eq!(to_group.len(), 1);
    assert!(to_group[0].text.starts_with("#BREAKING: "));
    assert!(to_group[0].has_button);

    let to_direct = courier.sent_to(7);
    assert_eq!(to_direct.len(), 1);
    assert!(to_direct[0].text.ends_with(
        "<a href=\"https://news.example.org/articles/news-42.html\">Open article</a>"
    ));
    assert!(!to_direct[0].has_button);
}

#[tokio::test]
async fn test_repeated_cycles_announce_once() {
    let courier = Arc::new(RecordingCourier::default());
    let subscribers = Arc::new(MemorySubscribers::with(&[-100, 7]));
    let watermark = Arc::new(MemoryWatermark::default());
    let feed = Arc::new(FixedFeed {
        response: Some(breaking_item("news-42")),
    });
    let watcher = make_watcher(feed, courier.clone(), subscribers, watermark);

    assert!(matches!(
        watcher.check().await.unwrap(),
        CycleOutcome::Announced(_)
    ));
    assert!(matches!(
        watcher.check().await.unwrap(),
        CycleOutcome::AlreadyAnnounced
    ));
    assert!(matches!(
        watcher.check().await.unwrap(),
        CycleOutcome::AlreadyAnnounced
    ));

    // One message per recipient in total, not per cycle.
    assert_eq!(courier.sent().len(), 2);
}

#[tokio::test]
async fn test_watermark_advances_from_previous_id() {
    let courier = Arc::new(RecordingCourier::default());
    let subscribers = Arc::new(MemorySubscribers::with(&[7]));
    let watermark = Arc::new(MemoryWatermark::with("news-41"));
    let feed = Arc::new(FixedFeed {
        response: Some(breaking_item("news-42")),
    });
    let watcher = make_watcher(feed, courier.clone(), subscribers, watermark.clone());

    let outcome = watcher.check().await.unwrap();

    assert!(matches!(outcome, CycleOutcome::Announced(_)));
    assert_eq!(watermark.current(), Some("news-42".to_string()));
    assert_eq!(courier.sent().len(), 1);
}

#[tokio::test]
async fn test_invalid_item_aborts_without_state_change() {
    let courier = Arc::new(RecordingCourier::default());
    let subscribers = Arc::new(MemorySubscribers::with(&[7]));
    let watermark = Arc::new(MemoryWatermark::default());
    let mut item = breaking_item("news-42");
    item.url = String::new();
    let feed = Arc::new(FixedFeed {
        response: Some(item),
    });
    let watcher = make_watcher(feed, courier.clone(), subscribers, watermark.clone());

    let err = watcher.check().await.unwrap_err();

    assert!(matches!(err, WatchError::InvalidItem { ref id } if id == "news-42"));
    assert!(courier.sent().is_empty());
    assert_eq!(watermark.current(), None);
}

#[tokio::test]
async fn test_non_breaking_item_is_skipped() {
    let courier = Arc::new(RecordingCourier::default());
    let subscribers = Arc::new(MemorySubscribers::with(&[7]));
    let watermark = Arc::new(MemoryWatermark::default());
    let mut item = breaking_item("news-42");
    item.breaking = false;
    let feed = Arc::new(FixedFeed {
        response: Some(item),
    });
    let watcher = make_watcher(feed, courier.clone(), subscribers, watermark.clone());

    assert!(matches!(
        watcher.check().await.unwrap(),
        CycleOutcome::NotBreaking
    ));
    assert!(courier.sent().is_empty());
    assert_eq!(watermark.current(), None);
}

#[tokio::test]
async fn test_empty_feed_is_quiet() {
    let courier = Arc::new(RecordingCourier::default());
    let subscribers = Arc::new(MemorySubscribers::with(&[7]));
    let watermark = Arc::new(MemoryWatermark::default());
    let feed = Arc::new(FixedFeed { response: None });
    let watcher = make_watcher(feed, courier.clone(), subscribers, watermark);

    assert!(matches!(
        watcher.check().await.unwrap(),
        CycleOutcome::NoNews
    ));
    assert!(courier.sent().is_empty());
}

#[tokio::test]
async fn test_feed_failure_leaves_state_untouched() {
    let courier = Arc::new(RecordingCourier::default());
    let subscribers = Arc::new(MemorySubscribers::with(&[7]));
    let watermark = Arc::new(MemoryWatermark::with("news-41"));
    let watcher = make_watcher(
        Arc::new(FailingFeed),
        courier.clone(),
        subscribers,
        watermark.clone(),
    );

    let err = watcher.check().await.unwrap_err();

    assert!(matches!(err, WatchError::Feed(FeedError::Status(_))));
    assert!(courier.sent().is_empty());
    assert_eq!(watermark.current(), Some("news-41".to_string()));
}

#[tokio::test]
async fn test_partial_delivery_failure_still_moves_watermark() {
    let courier = Arc::new(RecordingCourier::default());
    courier.script(
        7,
        vec![DeliveryOutcome::Other(
            "Forbidden: bot was blocked by the user".to_string(),
        )],
    );
    let subscribers = Arc::new(MemorySubscribers::with(&[7, 8]));
    let watermark = Arc::new(MemoryWatermark::default());
    let feed = Arc::new(FixedFeed {
        response: Some(breaking_item("news-42")),
    });
    let watcher = make_watcher(feed, courier.clone(), subscribers, watermark.clone());

    let CycleOutcome::Announced(report) = watcher.check().await.unwrap() else {
        panic!("expected an announcement");
    };

    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(watermark.current(), Some("news-42".to_string()));
}

/// Feed that stalls long enough for ticks to pile up if cycles could overlap.
#[derive(Default)]
struct SlowFeed {
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl FeedSource for SlowFeed {
    async fn fetch_latest(&self) -> Result<Option<NewsCandidate>, FeedError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[tokio::test]
async fn test_run_never_overlaps_cycles_and_stops_on_shutdown() {
    let feed = Arc::new(SlowFeed::default());
    let courier = Arc::new(RecordingCourier::default());
    let subscribers = Arc::new(MemorySubscribers::with(&[]));
    let watermark = Arc::new(MemoryWatermark::default());
    let watcher = make_watcher(feed.clone(), courier, subscribers, watermark);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { watcher.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert!(feed.calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(feed.max_active.load(Ordering::SeqCst), 1);
}

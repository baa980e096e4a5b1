//! Feed retrieval and parsing.
//!
//! One HTTP GET per cycle against the breaking-news endpoint, which serves a
//! JSON array of items ordered newest first. The candidate is the first
//! entry carrying a non-empty id. There are no retries here: a failed cycle
//! is retried wholesale on the next tick.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Timeout for one feed retrieval.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Feed returned HTTP {0}")]
    Status(StatusCode),

    #[error("Malformed feed payload: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One news item as the feed serves it.
///
/// Every field is defaulted so one sparse entry cannot fail the whole list;
/// entries without an id are skipped during candidate selection and the
/// remaining required fields are checked by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewsCandidate {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date: String,
    /// The endpoint lists breaking items, so a missing flag counts as
    /// breaking. An explicit `false` marks an entry that was downgraded
    /// after publication.
    #[serde(default = "default_breaking")]
    pub breaking: bool,
}

fn default_breaking() -> bool {
    true
}

/// Parse a feed body and select the candidate item.
pub fn parse_feed(body: &[u8]) -> Result<Option<NewsCandidate>, FeedError> {
    let items: Vec<NewsCandidate> = serde_json::from_slice(body)?;
    Ok(items.into_iter().find(|item| !item.id.is_empty()))
}

/// Source of breaking-news candidates, one lookup per cycle.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Option<NewsCandidate>, FeedError>;
}

/// HTTP implementation of [`FeedSource`].
pub struct FeedClient {
    http: Client,
    endpoint: String,
}

impl FeedClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_latest(&self) -> Result<Option<NewsCandidate>, FeedError> {
        let response = self
            .http
            .get(&self.endpoint)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        let body = response.bytes().await?;
        parse_feed(&body)
    }
}

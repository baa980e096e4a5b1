//! Dedup gate: decides whether a fetched candidate becomes an announcement.

use crate::feed::NewsCandidate;

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The feed had no candidate at all.
    NoNews,
    /// A candidate exists but is not flagged as breaking.
    NotBreaking,
    /// A breaking candidate is missing required fields; the cycle must
    /// abort without moving the watermark.
    Invalid { id: String },
    /// The candidate id matches the stored watermark.
    AlreadyAnnounced,
    /// A new, valid, breaking item that should be announced.
    NewBreakingNews(NewsCandidate),
}

/// Evaluate a candidate against the current watermark.
///
/// Dedup is an exact string match on the feed-assigned id. There is no
/// fuzzy matching and no time window: a feed that re-publishes an old id
/// stays silent, a feed that assigns a fresh id announces again.
pub fn evaluate(watermark: Option<&str>, candidate: Option<NewsCandidate>) -> Verdict {
    let Some(item) = candidate else {
        return Verdict::NoNews;
    };

    if !item.breaking {
        return Verdict::NotBreaking;
    }

    if item.id.is_empty() || item.url.is_empty() {
        return Verdict::Invalid { id: item.id };
    }

    if watermark == Some(item.id.as_str()) {
        return Verdict::AlreadyAnnounced;
    }

    Verdict::NewBreakingNews(item)
}

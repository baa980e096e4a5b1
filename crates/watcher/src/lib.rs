//! The watch-and-broadcast pipeline: feed polling, dedup gating, bulletin
//! rendering and subscriber fan-out.

pub mod broadcast;
pub mod feed;
pub mod format;
pub mod gate;
pub mod watcher;

pub use watcher::{CycleOutcome, NewsWatcher, WatchError};

//! Bot process: subscription commands and the long-poll update listener.

pub mod commands;
pub mod listener;

//! Minimal Telegram Bot API client, covering exactly the methods the bot
//! speaks: getMe, getUpdates, sendMessage and getChatMember.

pub mod client;
pub mod error;
pub mod types;

pub use client::Bot;
pub use error::TelegramError;

use thiserror::Error;

/// Failures talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Transport-level failure: connect, timeout, body decode.
    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with `ok == false`.
    #[error("Telegram API error {code}: {description}")]
    Api {
        code: i64,
        description: String,
        /// Set when the target group was upgraded to a supergroup and all
        /// traffic must move to the new chat id.
        migrate_to_chat_id: Option<i64>,
        /// Set when the bot exceeded a rate limit and must back off.
        retry_after_secs: Option<u64>,
    },

    /// `ok == true` but the result payload was missing.
    #[error("Telegram API returned an empty result for {method}")]
    EmptyResult { method: &'static str },
}

use serde::Deserialize;
use url::Url;

use crate::error::AppError;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Telegram bot token used for every Bot API call
    pub telegram_bot_token: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Breaking-news feed endpoint serving a JSON list of items
    pub feed_url: String,

    /// Canonical site origin used to absolutize relative article links
    pub feed_origin: String,

    /// Seconds between check cycles, measured from cycle completion (default: 60)
    pub check_interval_secs: u64,

    /// Maximum number of PostgreSQL connections in the pool (default: 5)
    pub db_max_connections: u32,

    /// Verbose logging, enabled by the presence of BREAKWIRE_DEBUG
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let feed_url = std::env::var("FEED_URL")
            .map_err(|_| AppError::Config("FEED_URL environment variable is required".into()))?;

        // The origin can be pinned explicitly; otherwise it is derived from
        // the feed endpoint itself.
        let feed_origin = match std::env::var("FEED_ORIGIN") {
            Ok(origin) => origin.trim_end_matches('/').to_string(),
            Err(_) => origin_of(&feed_url)?,
        };

        Ok(Self {
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| {
                AppError::Config("TELEGRAM_BOT_TOKEN environment variable is required".into())
            })?,
            database_url: std::env::var("DATABASE_URL").map_err(|_| {
                AppError::Config("DATABASE_URL environment variable is required".into())
            })?,
            feed_url,
            feed_origin,
            check_interval_secs: std::env::var("CHECK_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| AppError::Config("CHECK_INTERVAL_SECS must be a valid u64".into()))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| AppError::Config("DB_MAX_CONNECTIONS must be a valid u32".into()))?,
            debug: std::env::var("BREAKWIRE_DEBUG").is_ok(),
        })
    }
}

/// Scheme, host and non-default port of a URL, e.g. `https://news.example.org`.
fn origin_of(raw: &str) -> Result<String, AppError> {
    let url = Url::parse(raw)
        .map_err(|_| AppError::Config("FEED_URL must be an absolute http(s) URL".into()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Config(
            "FEED_URL must be an absolute http(s) URL".into(),
        ));
    }
    Ok(url.origin().ascii_serialization())
}

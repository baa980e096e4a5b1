//! Breakwire bot binary entrypoint.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use breakwire_common::config::AppConfig;
use breakwire_common::db::create_pool;
use breakwire_common::store::{
    PgSubscriberStore, PgWatermarkStore, SubscriberStore, WatermarkStore,
};
use breakwire_telegram::Bot;
use breakwire_watcher::NewsWatcher;
use breakwire_watcher::broadcast::TelegramCourier;
use breakwire_watcher::feed::FeedClient;

use breakwire_bot::listener::CommandListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    let default_filter = if config.debug {
        "breakwire_bot=debug,breakwire_watcher=debug,breakwire_telegram=debug,breakwire_common=debug"
    } else {
        "breakwire_bot=info,breakwire_watcher=info,breakwire_common=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("Breakwire starting...");

    // Connect to database
    let pool = create_pool(&config).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Identify the bot account behind the token
    let bot = Bot::new(config.telegram_bot_token.clone());
    let me = bot.get_me().await?;
    let username = me.username.unwrap_or_default();
    tracing::info!(username = %username, id = me.id, "Logged in to Telegram");

    let subscribers: Arc<dyn SubscriberStore> = Arc::new(PgSubscriberStore::new(pool.clone()));
    let watermark: Arc<dyn WatermarkStore> = Arc::new(PgWatermarkStore::new(pool.clone()));

    let watcher = NewsWatcher::new(
        Arc::new(FeedClient::new(config.feed_url.clone())),
        Arc::new(TelegramCourier::new(bot.clone())),
        Arc::clone(&subscribers),
        watermark,
        config.feed_origin.clone(),
        Duration::from_secs(config.check_interval_secs),
    );
    let listener = CommandListener::new(bot, Arc::clone(&subscribers), username);

    // Run both loops, stopping them gracefully on Ctrl+C
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { watcher.run(shutdown).await }
    });
    let listener_task = tokio::spawn(async move { listener.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, stopping gracefully...");
    let _ = shutdown_tx.send(true);

    watcher_task.await?;
    listener_task.await?;
    pool.close().await;

    tracing::info!("Breakwire stopped.");
    Ok(())
}

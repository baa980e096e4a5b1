//! Long-poll command listener.
//!
//! Pulls updates off `getUpdates` and dispatches the `/start`, `/stop` and
//! `/help` commands. Runs alongside the news watcher; the two only meet at
//! the subscriber store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use breakwire_common::store::SubscriberStore;
use breakwire_telegram::Bot;
use breakwire_telegram::types::Update;

use crate::commands;

/// Server-side hold of one getUpdates call.
const LONG_POLL_SECS: u64 = 10;

/// Pause after a failed getUpdates call before polling again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Help,
}

/// Extract a bot command from a message text.
///
/// A command is the first whitespace token, `/name` or `/name@BotName`. A
/// mismatched `@BotName` suffix addresses another bot and is ignored.
pub fn parse_command(text: &str, bot_username: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;

    let (name, addressee) = match command.split_once('@') {
        Some((name, addressee)) => (name, Some(addressee)),
        None => (command, None),
    };
    if let Some(addressee) = addressee
        && !addressee.eq_ignore_ascii_case(bot_username)
    {
        return None;
    }

    match name {
        "start" => Some(Command::Start),
        "stop" => Some(Command::Stop),
        "help" => Some(Command::Help),
        _ => None,
    }
}

/// Dispatches incoming commands to their handlers.
pub struct CommandListener {
    bot: Bot,
    subscribers: Arc<dyn SubscriberStore>,
    bot_username: String,
}

impl CommandListener {
    pub fn new(bot: Bot, subscribers: Arc<dyn SubscriberStore>, bot_username: String) -> Self {
        Self {
            bot,
            subscribers,
            bot_username,
        }
    }

    /// Poll for updates until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Command listener started");

        let mut offset: i64 = 0;
        loop {
            let updates = tokio::select! {
                result = self.bot.get_updates(offset, LONG_POLL_SECS) => result,
                _ = shutdown.changed() => break,
            };

            match updates {
                Ok(batch) => {
                    for update in batch {
                        offset = offset.max(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "Failed to fetch updates");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }

        tracing::info!("Command listener stopped");
    }

    async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(command) = parse_command(text, &self.bot_username) else {
            return;
        };

        tracing::debug!(chat_id = message.chat.id, ?command, "Handling command");
        match command {
            Command::Start => {
                commands::on_start(&self.bot, self.subscribers.as_ref(), &message).await
            }
            Command::Stop => commands::on_stop(&self.bot, self.subscribers.as_ref(), &message).await,
            Command::Help => commands::on_help(&self.bot, &message).await,
        }
    }
}

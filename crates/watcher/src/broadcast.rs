//! Fan-out of one bulletin to every subscriber.
//!
//! Per-recipient failures never abort the broadcast. The reactions are:
//! gone recipients get dropped from the store, migrated groups get
//! re-registered under their new id and the send is retried there, a rate
//! limit pauses the whole fan-out for the server-mandated interval, and
//! anything else is logged and skipped. All retries run inside one bounded
//! attempt loop.

use std::time::Duration;

use async_trait::async_trait;

use breakwire_common::store::SubscriberStore;
use breakwire_telegram::types::SendOptions;
use breakwire_telegram::{Bot, TelegramError};

use crate::format::{BUTTON_LABEL, Bulletin};

/// Send attempts per logical recipient within one cycle: the initial send
/// plus follow-ups after a migration or a rate-limit pause.
const MAX_SEND_ATTEMPTS: u32 = 3;

/// Classified result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The chat no longer exists or is out of reach for good.
    RecipientGone,
    /// The group was upgraded; future sends must target the new id.
    GroupMigrated { new_chat_id: i64 },
    /// Telegram asked us to back off before sending more.
    RateLimited { retry_after_secs: u64 },
    /// Unclassified failure. Logged, no state change.
    Other(String),
}

/// One rendered message on its way to a single recipient.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub text: String,
    pub button_url: Option<String>,
}

/// Delivery seam between the broadcaster and the transport.
#[async_trait]
pub trait Courier: Send + Sync {
    async fn deliver(&self, chat_id: i64, message: &OutboundMessage) -> DeliveryOutcome;
}

/// Production courier speaking the Bot API.
pub struct TelegramCourier {
    bot: Bot,
}

impl TelegramCourier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Courier for TelegramCourier {
    async fn deliver(&self, chat_id: i64, message: &OutboundMessage) -> DeliveryOutcome {
        let opts = match &message.button_url {
            Some(url) => SendOptions::with_button(BUTTON_LABEL, url),
            None => SendOptions::default(),
        };
        match self.bot.send_message(chat_id, &message.text, &opts).await {
            Ok(_) => DeliveryOutcome::Delivered,
            Err(err) => classify_send_error(err),
        }
    }
}

/// Map a transport error onto the outcome the broadcaster reacts to.
pub fn classify_send_error(err: TelegramError) -> DeliveryOutcome {
    match err {
        TelegramError::Api {
            retry_after_secs: Some(retry_after_secs),
            ..
        } => DeliveryOutcome::RateLimited { retry_after_secs },
        TelegramError::Api {
            migrate_to_chat_id: Some(new_chat_id),
            ..
        } => DeliveryOutcome::GroupMigrated { new_chat_id },
        TelegramError::Api {
            code: 400,
            ref description,
            ..
        } if description.contains("chat not found") => DeliveryOutcome::RecipientGone,
        other => DeliveryOutcome::Other(other.to_string()),
    }
}

/// Cycle-level fan-out statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub removed: usize,
    pub migrated: usize,
    pub failed: usize,
}

/// Sends one bulletin to every recipient and reacts to delivery failures.
pub struct Broadcaster<'a> {
    courier: &'a dyn Courier,
    subscribers: &'a dyn SubscriberStore,
}

impl<'a> Broadcaster<'a> {
    pub fn new(courier: &'a dyn Courier, subscribers: &'a dyn SubscriberStore) -> Self {
        Self {
            courier,
            subscribers,
        }
    }

    /// Deliver the bulletin to every chat in `recipients`: the group variant
    /// to negative ids, the direct variant to the rest.
    pub async fn broadcast(&self, bulletin: &Bulletin, recipients: &[i64]) -> BroadcastReport {
        let group_message = OutboundMessage {
            text: bulletin.group_text.clone(),
            button_url: Some(bulletin.button_url.clone()),
        };
        let direct_message = OutboundMessage {
            text: bulletin.direct_text.clone(),
            button_url: None,
        };

        let mut report = BroadcastReport::default();
        for &chat_id in recipients {
            let message = if chat_id < 0 {
                &group_message
            } else {
                &direct_message
            };
            self.deliver_one(chat_id, message, &mut report).await;
        }
        report
    }

    async fn deliver_one(
        &self,
        recipient: i64,
        message: &OutboundMessage,
        report: &mut BroadcastReport,
    ) {
        let mut target = recipient;
        for _ in 0..MAX_SEND_ATTEMPTS {
            match self.courier.deliver(target, message).await {
                DeliveryOutcome::Delivered => {
                    report.delivered += 1;
                    return;
                }
                DeliveryOutcome::RecipientGone => {
                    tracing::warn!(chat_id = target, "Chat gone, dropping subscription");
                    if let Err(err) = self.subscribers.delete(target).await {
                        tracing::error!(chat_id = target, error = %err, "Failed to drop subscription");
                    }
                    report.removed += 1;
                    return;
                }
                DeliveryOutcome::GroupMigrated { new_chat_id } => {
                    tracing::info!(
                        old_chat_id = target,
                        new_chat_id,
                        "Group migrated, moving subscription"
                    );
                    if let Err(err) = self.subscribers.delete(target).await {
                        tracing::error!(chat_id = target, error = %err, "Failed to drop old subscription");
                    }
                    if let Err(err) = self.subscribers.create(new_chat_id).await {
                        tracing::error!(chat_id = new_chat_id, error = %err, "Failed to register migrated chat");
                    }
                    report.migrated += 1;
                    target = new_chat_id;
                }
                DeliveryOutcome::RateLimited { retry_after_secs } => {
                    tracing::warn!(
                        chat_id = target,
                        retry_after_secs,
                        "Rate limited, pausing broadcast"
                    );
                    tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                }
                DeliveryOutcome::Other(description) => {
                    tracing::error!(chat_id = target, error = %description, "Delivery failed");
                    report.failed += 1;
                    return;
                }
            }
        }

        tracing::error!(
            chat_id = target,
            attempts = MAX_SEND_ATTEMPTS,
            "Delivery still failing, giving up"
        );
        report.failed += 1;
    }
}

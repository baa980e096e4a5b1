//! Subscription command handlers.
//!
//! `/start` and `/stop` mutate the subscriber store; in group chats both
//! are restricted to administrators. All replies are HTML.

use breakwire_common::store::SubscriberStore;
use breakwire_telegram::Bot;
use breakwire_telegram::types::{Message, SendOptions};

const ADMIN_ONLY_SUBSCRIBE: &str = "❌ Only group administrators can subscribe this group.";
const ADMIN_ONLY_UNSUBSCRIBE: &str = "❌ Only group administrators can unsubscribe this group.";
const SUBSCRIBE_FAILED: &str = "❌ Something went wrong while subscribing. Please try again later.";
const UNSUBSCRIBE_FAILED: &str =
    "❌ Something went wrong while unsubscribing. Please try again later.";

const HELP_TEXT: &str = "<b>Breaking news bot</b>\n\
    This bot announces breaking news shortly after it is published.\n\n\
    <b>/start</b>: subscribe to breaking news\n\
    <b>/stop</b>: unsubscribe from breaking news";

pub async fn on_start(bot: &Bot, subscribers: &dyn SubscriberStore, message: &Message) {
    let chat_id = message.chat.id;
    if message.chat.is_group() && !from_admin(bot, message).await {
        reply(bot, chat_id, ADMIN_ONLY_SUBSCRIBE).await;
        return;
    }

    match subscribers.exists(chat_id).await {
        Ok(true) => {
            reply(
                bot,
                chat_id,
                "<b>✅ You are already receiving breaking news.</b>\n\
                 Use /stop to unsubscribe.",
            )
            .await;
        }
        Ok(false) => {
            if let Err(err) = subscribers.create(chat_id).await {
                tracing::error!(chat_id, error = %err, "Failed to store subscription");
                reply(bot, chat_id, SUBSCRIBE_FAILED).await;
                return;
            }
            tracing::info!(chat_id, "New subscriber");

            let warning = if message.chat.is_group() {
                "If you remove the bot from this group, you will have to subscribe again!"
            } else {
                "If you block the bot, you will have to subscribe again!"
            };
            let text = format!(
                "<b>✅ You will now receive breaking news!</b>\n\
                 Use /stop if you no longer want to be notified.\n\n\
                 <b>NOTE:</b> {warning}"
            );
            reply(bot, chat_id, &text).await;
        }
        Err(err) => {
            tracing::error!(chat_id, error = %err, "Failed to check subscription");
            reply(bot, chat_id, SUBSCRIBE_FAILED).await;
        }
    }
}

pub async fn on_stop(bot: &Bot, subscribers: &dyn SubscriberStore, message: &Message) {
    let chat_id = message.chat.id;
    if message.chat.is_group() && !from_admin(bot, message).await {
        reply(bot, chat_id, ADMIN_ONLY_UNSUBSCRIBE).await;
        return;
    }

    match subscribers.exists(chat_id).await {
        Ok(false) => {
            reply(
                bot,
                chat_id,
                "<b>❌ You are not subscribed to breaking news.</b>\n\
                 Use /start to subscribe.",
            )
            .await;
        }
        Ok(true) => {
            if let Err(err) = subscribers.delete(chat_id).await {
                tracing::error!(chat_id, error = %err, "Failed to remove subscription");
                reply(bot, chat_id, UNSUBSCRIBE_FAILED).await;
                return;
            }
            tracing::info!(chat_id, "Subscription removed");
            reply(
                bot,
                chat_id,
                "<b>✅ You will no longer receive breaking news.</b>\n\
                 Use /start to subscribe again.",
            )
            .await;
        }
        Err(err) => {
            tracing::error!(chat_id, error = %err, "Failed to check subscription");
            reply(bot, chat_id, UNSUBSCRIBE_FAILED).await;
        }
    }
}

pub async fn on_help(bot: &Bot, message: &Message) {
    reply(bot, message.chat.id, HELP_TEXT).await;
}

/// True when the message sender is a creator or administrator of the chat.
/// Lookup failures count as not an admin.
async fn from_admin(bot: &Bot, message: &Message) -> bool {
    let Some(from) = &message.from else {
        return false;
    };
    match bot.get_chat_member(message.chat.id, from.id).await {
        Ok(member) => member.is_admin(),
        Err(err) => {
            tracing::warn!(
                chat_id = message.chat.id,
                user_id = from.id,
                error = %err,
                "Admin lookup failed"
            );
            false
        }
    }
}

/// Send a reply with the default options. Failures are logged, not raised;
/// a missed reply must not take down the listener.
async fn reply(bot: &Bot, chat_id: i64, text: &str) {
    if let Err(err) = bot.send_message(chat_id, text, &SendOptions::default()).await {
        tracing::warn!(chat_id, error = %err, "Failed to send reply");
    }
}

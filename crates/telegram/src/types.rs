//! Wire types for the subset of the Bot API this bot uses.
//!
//! Only fields that are actually read get modeled; everything else in the
//! payload is ignored on deserialization, so additive API changes do not
//! break parsing.

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method returns.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<i64>,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

/// Extra failure context Telegram attaches to some error responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseParameters {
    pub migrate_to_chat_id: Option<i64>,
    pub retry_after: Option<u64>,
}

/// A Telegram user, including the bot itself as returned by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    /// One of "private", "group", "supergroup" or "channel".
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

impl Chat {
    pub fn is_group(&self) -> bool {
        self.kind == "group" || self.kind == "supergroup"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// One member of a chat, from `getChatMember`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: User,
}

impl ChatMember {
    /// Creators and administrators may manage group subscriptions.
    pub fn is_admin(&self) -> bool {
        self.status == "creator" || self.status == "administrator"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub url: String,
}

impl InlineKeyboardMarkup {
    /// A keyboard holding exactly one URL button.
    pub fn url_button(label: &str, url: &str) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: label.to_string(),
                url: url.to_string(),
            }]],
        }
    }
}

/// Options applied to an outgoing `sendMessage`.
///
/// The defaults mirror how every message in this bot goes out: link previews
/// suppressed and delivery allowed even when a replied-to message is gone.
/// The body is always HTML.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub disable_web_page_preview: bool,
    pub allow_sending_without_reply: bool,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            disable_web_page_preview: true,
            allow_sending_without_reply: true,
            reply_markup: None,
        }
    }
}

impl SendOptions {
    /// Default options plus a single URL button under the message.
    pub fn with_button(label: &str, url: &str) -> Self {
        Self {
            reply_markup: Some(InlineKeyboardMarkup::url_button(label, url)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    pub parse_mode: &'static str,
    pub disable_web_page_preview: bool,
    pub allow_sending_without_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GetUpdatesRequest {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub(crate) struct GetChatMemberRequest {
    pub chat_id: i64,
    pub user_id: i64,
}

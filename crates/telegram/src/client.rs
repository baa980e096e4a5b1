//! HTTP client for the Bot API.
//!
//! No bot framework; every method is a JSON POST to
//! `https://api.telegram.org/bot<token>/<method>` followed by unwrapping the
//! standard `{ok, result, ...}` envelope.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::TelegramError;
use crate::types::{
    ApiResponse, ChatMember, GetChatMemberRequest, GetUpdatesRequest, Message,
    SendMessageRequest, SendOptions, Update, User,
};

const API_BASE: &str = "https://api.telegram.org";

/// Timeout for ordinary API calls. Long polls pad this with the server-side
/// hold so the connection outlives it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared handle to one bot account. Cheap to clone.
#[derive(Clone)]
pub struct Bot {
    http: Client,
    token: String,
}

impl Bot {
    pub fn new(token: String) -> Self {
        Self {
            http: Client::new(),
            token,
        }
    }

    /// Identify the bot account behind the token.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT)
            .await
    }

    /// Long-poll for incoming updates. Only message updates are requested.
    ///
    /// `timeout_secs` is how long the server holds the request open when no
    /// updates are pending.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message"],
        };
        self.call(
            "getUpdates",
            &request,
            REQUEST_TIMEOUT + Duration::from_secs(timeout_secs),
        )
        .await
    }

    /// Send an HTML-formatted text message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        opts: &SendOptions,
    ) -> Result<Message, TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: opts.disable_web_page_preview,
            allow_sending_without_reply: opts.allow_sending_without_reply,
            reply_markup: opts.reply_markup.as_ref(),
        };
        self.call("sendMessage", &request, REQUEST_TIMEOUT).await
    }

    /// Look up one member of a chat.
    pub async fn get_chat_member(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatMember, TelegramError> {
        let request = GetChatMemberRequest { chat_id, user_id };
        self.call("getChatMember", &request, REQUEST_TIMEOUT).await
    }

    async fn call<R, T>(
        &self,
        method: &'static str,
        request: &R,
        timeout: Duration,
    ) -> Result<T, TelegramError>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{API_BASE}/bot{}/{}", self.token, method);
        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        let payload: ApiResponse<T> = response.json().await?;
        if !payload.ok {
            let (migrate_to_chat_id, retry_after_secs) = payload
                .parameters
                .map(|p| (p.migrate_to_chat_id, p.retry_after))
                .unwrap_or((None, None));
            return Err(TelegramError::Api {
                code: payload.error_code.unwrap_or(0),
                description: payload
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
                migrate_to_chat_id,
                retry_after_secs,
            });
        }

        payload.result.ok_or(TelegramError::EmptyResult { method })
    }
}

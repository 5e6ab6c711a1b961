//! Telegram Bot API client

use super::types::{
    ApiResponse, GetUpdatesRequest, ReplyKeyboardMarkup, SendMessageRequest, Update, User,
};
use super::TransportError;
use crate::keyboard::Keyboard;
use crate::state_machine::UserId;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Slack added to the HTTP timeout on top of the long-poll timeout
const POLL_SLACK: Duration = Duration::from_secs(10);

/// Thin client over the Bot API methods the bot needs
pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(token: &str, api_url: &str, poll_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(poll_timeout + POLL_SLACK)
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
            poll_timeout,
        })
    }

    /// Verify the token and fetch the bot's own account
    pub async fn get_me(&self) -> Result<User, TransportError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request).await
    }

    pub async fn send_message(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError> {
        let request = SendMessageRequest {
            chat_id: user.0,
            text,
            reply_markup: keyboard.map(ReplyKeyboardMarkup::from),
        };
        let _: serde_json::Value = self.call("sendMessage", &request).await?;
        Ok(())
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{method}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            TransportError::from_status(status.as_u16(), format!("{method}: {e}"))
        })?;
        unwrap_envelope(method, status.as_u16(), envelope)
    }
}

fn unwrap_envelope<T>(
    method: &str,
    status: u16,
    envelope: ApiResponse<T>,
) -> Result<T, TransportError> {
    if envelope.ok {
        return envelope
            .result
            .ok_or_else(|| TransportError::unknown(format!("{method}: ok response without result")));
    }

    let description = envelope
        .description
        .unwrap_or_else(|| "no description".to_string());
    let code = envelope.error_code.unwrap_or(status);
    let mut error = TransportError::from_status(code, format!("{method}: {description}"));
    if let Some(seconds) = envelope.parameters.and_then(|p| p.retry_after) {
        error = error.with_retry_after(Duration::from_secs(seconds));
    }
    Err(error)
}

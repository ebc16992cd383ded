//! Telegram Bot API HTTP client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{TransportError, TransportResult};
use crate::transport::{ChatTransport, ChoiceMenu, MessageRef};

use super::types::{
    AnswerCallbackQueryParams, ApiResponse, EditMessageTextParams, GetUpdatesParams,
    InlineKeyboardMarkup, Message, SendMessageParams, Update, User,
};

/// Configuration for the Bot API client.
#[derive(Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub api_url: String,
    /// Long-poll wait passed to `getUpdates`
    pub poll_timeout: Duration,
    /// Bound on ordinary calls
    pub request_timeout: Duration,
    /// Bound on video uploads
    pub upload_timeout: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("poll_timeout", &self.poll_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("upload_timeout", &self.upload_timeout)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

impl TelegramConfig {
    /// Create config from environment variables. `TELEGRAM_TOKEN` is required.
    pub fn from_env() -> TransportResult<Self> {
        let defaults = Self::default();
        let token = std::env::var("TELEGRAM_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TransportError::Config("TELEGRAM_TOKEN is not set".to_string()))?;

        Ok(Self {
            token,
            api_url: std::env::var("TELEGRAM_API_URL").unwrap_or(defaults.api_url),
            poll_timeout: std::env::var("TELEGRAM_POLL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_timeout),
            ..defaults
        })
    }
}

/// Bot API client.
pub struct TelegramClient {
    http: Client,
    /// `{api_url}/bot{token}`
    base_url: String,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> TransportResult<Self> {
        if config.token.trim().is_empty() {
            return Err(TransportError::Config("bot token is empty".to_string()));
        }

        let http = Client::builder().build().map_err(TransportError::network)?;
        let base_url = format!(
            "{}/bot{}",
            config.api_url.trim_end_matches('/'),
            config.token
        );

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Identity of the bot; fails if the token is rejected.
    pub async fn get_me(&self) -> TransportResult<User> {
        self.call("getMe", &serde_json::json!({}), self.config.request_timeout)
            .await
    }

    /// Long-poll for updates with id >= `offset`.
    pub async fn get_updates(&self, offset: i64) -> TransportResult<Vec<Update>> {
        let params = GetUpdatesParams {
            offset,
            timeout: self.config.poll_timeout.as_secs(),
            allowed_updates: vec!["message", "callback_query"],
        };
        // The HTTP request must outlive the server-side wait.
        let timeout = self.config.poll_timeout + self.config.request_timeout;
        self.call("getUpdates", &params, timeout).await
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Duration) -> TransportResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(TransportError::network)?;

        let envelope: ApiResponse<R> = response.json().await.map_err(TransportError::network)?;
        unwrap_envelope(method, envelope)
    }
}

fn unwrap_envelope<R>(method: &str, envelope: ApiResponse<R>) -> TransportResult<R> {
    if !envelope.ok {
        return Err(TransportError::api(
            envelope.error_code.unwrap_or_default(),
            envelope
                .description
                .unwrap_or_else(|| format!("{} failed", method)),
        ));
    }
    envelope
        .result
        .ok_or_else(|| {
            TransportError::InvalidResponse(format!("{} returned no result", method))
        })
}

/// Editing a message to its current content is rejected by the API.
fn is_not_modified(err: &TransportError) -> bool {
    matches!(
        err,
        TransportError::Api { description, .. } if description.contains("message is not modified")
    )
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> TransportResult<MessageRef> {
        let message: Message = self
            .call(
                "sendMessage",
                &SendMessageParams { chat_id, text },
                self.config.request_timeout,
            )
            .await?;
        Ok(message.to_ref())
    }

    async fn edit_text(
        &self,
        message: &MessageRef,
        text: &str,
        menu: Option<&ChoiceMenu>,
    ) -> TransportResult<()> {
        let params = EditMessageTextParams {
            chat_id: message.chat_id,
            message_id: message.message_id,
            text,
            reply_markup: menu.map(InlineKeyboardMarkup::from),
        };

        match self
            .call::<_, serde_json::Value>("editMessageText", &params, self.config.request_timeout)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_modified(&e) => {
                debug!(message_id = message.message_id, "Message already up to date");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn answer_choice(&self, choice_id: &str) -> TransportResult<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQueryParams {
                    callback_query_id: choice_id,
                },
                self.config.request_timeout,
            )
            .await?;
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> TransportResult<()> {
        let data = tokio::fs::read(path).await?;
        let size_bytes = data.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str("video/mp4")
            .map_err(TransportError::network)?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("supports_streaming", "true")
            .part("video", part);

        let response = self
            .http
            .post(self.method_url("sendVideo"))
            .timeout(self.config.upload_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(TransportError::network)?;

        let envelope: ApiResponse<Message> =
            response.json().await.map_err(TransportError::network)?;
        unwrap_envelope("sendVideo", envelope)?;

        info!(chat_id, size_bytes, "Video delivered");
        Ok(())
    }
}

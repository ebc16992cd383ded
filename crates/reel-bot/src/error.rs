//! Bot error types.

use thiserror::Error;

use reel_imagegen::{ImageGenError, ImageGenFailure};
use reel_media::{AudioFailure, MediaError};

use crate::messages;

pub type BotResult<T> = Result<T, BotError>;
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures talking to the chat platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// Wrap a reqwest error, dropping the request URL (it embeds the bot token).
    pub fn network(err: reqwest::Error) -> Self {
        Self::Network(err.without_url())
    }

    pub fn api(code: i64, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
        }
    }
}

/// Errors surfaced while handling a chat event.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Session expired")]
    SessionExpired,

    #[error("No such track: {0}")]
    TrackNotFound(String),

    #[error("Image generation failed: {0}")]
    ImageGeneration(#[from] ImageGenError),

    #[error("Audio retrieval failed ({kind}): {message}")]
    AudioRetrieval { kind: AudioFailure, message: String },

    #[error("Video encoding failed: {0}")]
    VideoEncoding(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<MediaError> for BotError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::TrackNotFound(id) => BotError::TrackNotFound(id),
            MediaError::AudioRetrievalFailed { kind, message } => {
                BotError::AudioRetrieval { kind, message }
            }
            other => BotError::VideoEncoding(other.to_string()),
        }
    }
}

impl BotError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Text shown to the user in place of the status message.
    pub fn user_message(&self) -> String {
        match self {
            BotError::SessionExpired => messages::error(messages::SESSION_EXPIRED),
            BotError::TrackNotFound(id) => messages::error(&format!(
                "Unknown music track \"{}\". Please choose one of the offered tracks.",
                id
            )),
            BotError::ImageGeneration(e) => match e.kind() {
                ImageGenFailure::Quota => messages::image_failure(messages::IMAGE_QUOTA),
                ImageGenFailure::Auth => messages::image_failure(messages::IMAGE_AUTH),
                ImageGenFailure::Generic => {
                    messages::image_failure(&format!("Failed to generate image: {}", e))
                }
            },
            BotError::AudioRetrieval {
                kind: AudioFailure::Timeout,
                ..
            } => messages::error(
                "Failed to download audio track: the music server did not respond in time.",
            ),
            BotError::AudioRetrieval { message, .. } => {
                messages::error(&format!("Failed to download audio track: {}", message))
            }
            BotError::VideoEncoding(message) => {
                messages::error(&format!("Video creation failed: {}", message))
            }
            BotError::Transport(_) | BotError::Config(_) => messages::unexpected_error(),
        }
    }
}

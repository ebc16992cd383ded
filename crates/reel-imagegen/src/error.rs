//! Image generation error types.

use std::fmt;

use thiserror::Error;

use crate::types::ApiErrorDetail;

pub type ImageGenResult<T> = Result<T, ImageGenError>;

/// Error codes meaning the account cannot generate right now.
const QUOTA_CODES: &[&str] = &[
    "billing_hard_limit_reached",
    "insufficient_quota",
    "rate_limit_exceeded",
];

/// Error codes meaning the credentials were rejected.
const AUTH_CODES: &[&str] = &["invalid_api_key"];

/// Coarse failure category shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageGenFailure {
    Quota,
    Auth,
    Generic,
}

impl ImageGenFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageGenFailure::Quota => "quota",
            ImageGenFailure::Auth => "auth",
            ImageGenFailure::Generic => "generic",
        }
    }
}

impl fmt::Display for ImageGenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ImageGenError {
    #[error("Image service quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("Image service rejected credentials: {0}")]
    AuthFailed(String),

    #[error("Image generation failed: {0}")]
    Failed(String),

    #[error("Invalid image payload: {0}")]
    InvalidImage(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ImageGenError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Classify a non-2xx API response.
    ///
    /// `detail` is the parsed error envelope if there was one; `body` is the
    /// raw response text used as the message otherwise.
    pub fn from_api_response(status: u16, detail: Option<ApiErrorDetail>, body: &str) -> Self {
        let detail = detail.unwrap_or_default();
        let code = detail.code.as_deref().unwrap_or_default();
        let error_type = detail.error_type.as_deref().unwrap_or_default();
        let message = if detail.message.is_empty() {
            format!("HTTP {}: {}", status, body.trim())
        } else {
            detail.message.clone()
        };

        let is_code = |codes: &[&str]| codes.contains(&code) || codes.contains(&error_type);

        if is_code(QUOTA_CODES) {
            Self::QuotaExceeded(message)
        } else if is_code(AUTH_CODES) || status == 401 {
            Self::AuthFailed(message)
        } else if status == 429 {
            Self::QuotaExceeded(message)
        } else {
            Self::Failed(message)
        }
    }

    pub fn kind(&self) -> ImageGenFailure {
        match self {
            ImageGenError::QuotaExceeded(_) => ImageGenFailure::Quota,
            ImageGenError::AuthFailed(_) => ImageGenFailure::Auth,
            _ => ImageGenFailure::Generic,
        }
    }
}

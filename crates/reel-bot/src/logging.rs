//! Tracing setup and per-event logging.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_models::UserId;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,reel_bot=info,reel_media=info,reel_imagegen=info";

/// Output format of the log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Colored human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// `LOG_FORMAT=json` selects JSON; anything else is text.
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }

    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Install the global subscriber.
pub fn init_tracing(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init(),
    }
}

/// Structured logger for the handling of one chat event.
#[derive(Debug, Clone)]
pub struct EventLogger {
    user_id: UserId,
    event: &'static str,
}

impl EventLogger {
    /// `event` names the kind of event, e.g. "prompt" or "track_selection".
    pub fn new(user_id: UserId, event: &'static str) -> Self {
        Self { user_id, event }
    }

    pub fn log_start(&self, message: &str) {
        info!(user_id = %self.user_id, event = self.event, "Event started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(user_id = %self.user_id, event = self.event, "Event progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(user_id = %self.user_id, event = self.event, "Event warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(user_id = %self.user_id, event = self.event, "Event error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(user_id = %self.user_id, event = self.event, "Event completed: {}", message);
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Span covering the whole event.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("event", user_id = %self.user_id, event = self.event)
    }
}

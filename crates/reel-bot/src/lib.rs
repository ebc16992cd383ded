//! Telegram bot turning text prompts into short music-backed videos.
//!
//! A prompt is sent to the image generator; the resulting image is kept in
//! the [`SessionStore`] until the user picks a background track, then the
//! video assembler renders a zoom clip over it and the clip is delivered.

pub mod config;
pub mod error;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod orchestrator;
pub mod session_store;
pub mod telegram;
pub mod transport;

pub use config::BotConfig;
pub use error::{BotError, BotResult, TransportError, TransportResult};
pub use logging::{init_tracing, EventLogger, LogFormat};
pub use orchestrator::{BotCommand, BotEvent, Orchestrator};
pub use session_store::{Session, SessionStore};
pub use transport::{ChatTransport, ChoiceButton, ChoiceMenu, MessageRef};

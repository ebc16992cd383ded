//! Telegram Bot API transport.
//!
//! [`TelegramClient`] implements [`ChatTransport`](crate::transport::ChatTransport)
//! over HTTPS; [`Poller`] long-polls `getUpdates` and dispatches events.

pub mod client;
pub mod poller;
pub mod types;

pub use client::{TelegramClient, TelegramConfig};
pub use poller::{event_from_update, Poller};

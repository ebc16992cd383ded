//! Long-poll loop feeding updates to the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use reel_models::UserId;

use crate::orchestrator::{BotCommand, BotEvent, Orchestrator};

use super::client::TelegramClient;
use super::types::Update;

/// Pause after a failed `getUpdates` call.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(3);

/// Translate an update into an event; `None` for updates the bot ignores.
pub fn event_from_update(update: Update) -> Option<BotEvent> {
    if let Some(query) = update.callback_query {
        let token = query.data?;
        let message = query.message.as_ref().map(|m| m.to_ref());
        return Some(BotEvent::TrackSelected {
            chat_id: message.map(|m| m.chat_id).unwrap_or(query.from.id),
            user_id: UserId(query.from.id),
            choice_id: query.id,
            message,
            token,
        });
    }

    let message = update.message?;
    let user = message.from?;
    if user.is_bot {
        return None;
    }
    let text = message.text?;
    let chat_id = message.chat.id;
    let user_id = UserId(user.id);

    Some(match BotCommand::parse(&text) {
        Some(command) => BotEvent::Command {
            chat_id,
            user_id,
            command,
        },
        None => BotEvent::Prompt {
            chat_id,
            user_id,
            text,
        },
    })
}

/// Drives the bot until shutdown.
pub struct Poller {
    client: Arc<TelegramClient>,
    orchestrator: Arc<Orchestrator>,
    shutdown_timeout: Duration,
}

impl Poller {
    pub fn new(
        client: Arc<TelegramClient>,
        orchestrator: Arc<Orchestrator>,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            client,
            orchestrator,
            shutdown_timeout,
        }
    }

    /// Poll until `shutdown` flips, then wait for in-flight events.
    ///
    /// Every event runs on its own task so one long render never delays
    /// other users.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();
        let mut offset = 0i64;

        info!("Polling for updates");

        loop {
            let polled = tokio::select! {
                _ = shutdown.changed() => break,
                polled = self.client.get_updates(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(event) = event_from_update(update) else {
                            continue;
                        };
                        debug!(
                            kind = event.kind(),
                            user_id = %event.user_id(),
                            "Dispatching event"
                        );
                        let orchestrator = Arc::clone(&self.orchestrator);
                        tasks.spawn(async move { orchestrator.handle(event).await });
                    }
                }
                Err(e) => {
                    warn!("getUpdates failed, retrying in {:?}: {}", POLL_ERROR_BACKOFF, e);
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => {}
                    }
                }
            }

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    error!("Event task failed: {}", e);
                }
            }
        }

        self.drain(tasks).await;
    }

    async fn drain(&self, mut tasks: JoinSet<()>) {
        if tasks.is_empty() {
            return;
        }

        info!(in_flight = tasks.len(), "Waiting for in-flight events");
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while let Some(finished) = tasks.join_next().await {
                if let Err(e) = finished {
                    error!("Event task failed: {}", e);
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                aborted = tasks.len(),
                "Shutdown timeout reached, aborting remaining events"
            );
            tasks.shutdown().await;
        }
    }
}

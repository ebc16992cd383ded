//! Routes chat events to the image generator and the video assembler.
//!
//! Prompt flow: status message, image generation, session stored, status
//! turned into the track menu. Track flow: choice acknowledged, session
//! taken, video rendered and delivered, output deleted.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn, Instrument};

use reel_imagegen::ImageGenerator;
use reel_media::VideoAssembler;
use reel_models::UserId;

use crate::error::{BotError, BotResult};
use crate::logging::EventLogger;
use crate::messages;
use crate::metrics;
use crate::session_store::{Session, SessionStore};
use crate::transport::{parse_track_token, ChatTransport, ChoiceMenu, MessageRef};

/// Slash commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Unknown(String),
}

impl BotCommand {
    /// Parse `/name[@botname] [args]`; `None` when `text` is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim_start().strip_prefix('/')?;
        let word = word.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default();

        Some(match name.to_ascii_lowercase().as_str() {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            _ => BotCommand::Unknown(name.to_string()),
        })
    }
}

/// An inbound chat event.
#[derive(Debug, Clone)]
pub enum BotEvent {
    Command {
        chat_id: i64,
        user_id: UserId,
        command: BotCommand,
    },
    Prompt {
        chat_id: i64,
        user_id: UserId,
        text: String,
    },
    TrackSelected {
        chat_id: i64,
        user_id: UserId,
        /// Id used to acknowledge the choice
        choice_id: String,
        /// Message carrying the menu, when the platform reports it
        message: Option<MessageRef>,
        token: String,
    },
}

impl BotEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            BotEvent::Command { user_id, .. }
            | BotEvent::Prompt { user_id, .. }
            | BotEvent::TrackSelected { user_id, .. } => *user_id,
        }
    }

    pub fn chat_id(&self) -> i64 {
        match self {
            BotEvent::Command { chat_id, .. }
            | BotEvent::Prompt { chat_id, .. }
            | BotEvent::TrackSelected { chat_id, .. } => *chat_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BotEvent::Command { .. } => "command",
            BotEvent::Prompt { .. } => "prompt",
            BotEvent::TrackSelected { .. } => "track_selection",
        }
    }
}

pub struct Orchestrator {
    sessions: SessionStore,
    images: Arc<dyn ImageGenerator>,
    assembler: Arc<VideoAssembler>,
    transport: Arc<dyn ChatTransport>,
    menu: ChoiceMenu,
}

impl Orchestrator {
    pub fn new(
        sessions: SessionStore,
        images: Arc<dyn ImageGenerator>,
        assembler: Arc<VideoAssembler>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        let menu = ChoiceMenu::for_tracks(assembler.catalog());
        Self {
            sessions,
            images,
            assembler,
            transport,
            menu,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn menu(&self) -> &ChoiceMenu {
        &self.menu
    }

    /// Handle one event to completion.
    ///
    /// Domain failures are turned into chat messages by the handlers. A
    /// transport failure escaping them is logged and, if the chat is still
    /// reachable, reported as an unexpected error.
    pub async fn handle(&self, event: BotEvent) {
        let logger = EventLogger::new(event.user_id(), event.kind());
        let chat_id = event.chat_id();
        let span = logger.create_span();

        async {
            let result = match event {
                BotEvent::Command { command, .. } => self.handle_command(chat_id, command).await,
                BotEvent::Prompt { user_id, text, .. } => {
                    self.handle_prompt(chat_id, user_id, text, &logger).await
                }
                BotEvent::TrackSelected {
                    user_id,
                    choice_id,
                    message,
                    token,
                    ..
                } => {
                    self.handle_track_selection(
                        chat_id, user_id, &choice_id, message, &token, &logger,
                    )
                    .await
                }
            };

            if let Err(e) = result {
                logger.log_error(&e.to_string());
                if let Err(send_err) = self
                    .transport
                    .send_text(chat_id, &messages::unexpected_error())
                    .await
                {
                    warn!(chat_id, "Could not report failure to chat: {}", send_err);
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn handle_command(&self, chat_id: i64, command: BotCommand) -> BotResult<()> {
        let text = match command {
            BotCommand::Start => messages::WELCOME,
            BotCommand::Help => messages::HELP,
            BotCommand::Unknown(name) => {
                debug!(command = %name, "Unknown command");
                messages::HELP
            }
        };
        self.transport.send_text(chat_id, text).await?;
        Ok(())
    }

    pub async fn handle_prompt(
        &self,
        chat_id: i64,
        user_id: UserId,
        prompt: String,
        logger: &EventLogger,
    ) -> BotResult<()> {
        logger.log_start("generating image");
        let status = self
            .transport
            .send_text(chat_id, messages::GENERATING_IMAGE)
            .await?;

        match self.images.generate(&prompt).await {
            Ok(image) => {
                metrics::record_image_generated();
                self.sessions.put(user_id, image, prompt);
                self.transport
                    .edit_text(&status, messages::CHOOSE_TRACK, Some(&self.menu))
                    .await?;
                logger.log_completion("image ready, waiting for a track");
            }
            Err(e) => {
                metrics::record_image_failure(e.kind().as_str());
                logger.log_warning(&format!("image generation failed ({}): {}", e.kind(), e));
                let err = BotError::from(e);
                self.transport
                    .edit_text(&status, &err.user_message(), None)
                    .await?;
            }
        }

        Ok(())
    }

    pub async fn handle_track_selection(
        &self,
        chat_id: i64,
        user_id: UserId,
        choice_id: &str,
        message: Option<MessageRef>,
        token: &str,
        logger: &EventLogger,
    ) -> BotResult<()> {
        if let Err(e) = self.transport.answer_choice(choice_id).await {
            logger.log_warning(&format!("could not acknowledge choice: {}", e));
        }

        let Some(track_id) = parse_track_token(token) else {
            debug!(token, "Ignoring foreign choice token");
            return Ok(());
        };

        let Some(session) = self.sessions.take(user_id) else {
            logger.log_warning("no pending session");
            self.show(chat_id, message, &BotError::SessionExpired.user_message())
                .await?;
            return Ok(());
        };

        let status = self.show(chat_id, message, messages::CREATING_VIDEO).await?;
        logger.log_start(&format!("rendering with track {}", track_id));

        match self.create_and_deliver(chat_id, &session, track_id, logger).await {
            Ok(()) => logger.log_completion("video delivered"),
            Err(e) => {
                logger.log_warning(&e.to_string());
                self.transport
                    .edit_text(&status, &e.user_message(), None)
                    .await?;
            }
        }

        Ok(())
    }

    /// Render, upload, then delete the output whatever the upload outcome.
    async fn create_and_deliver(
        &self,
        chat_id: i64,
        session: &Session,
        track_id: &str,
        logger: &EventLogger,
    ) -> BotResult<()> {
        let started = Instant::now();
        let video = match self.assembler.create_video(&session.image, track_id).await {
            Ok(video) => video,
            Err(e) => {
                metrics::record_render_failure(e.stage().as_str());
                return Err(e.into());
            }
        };
        metrics::record_video_rendered(started.elapsed().as_secs_f64());
        logger.log_progress(&format!(
            "video rendered ({} bytes), uploading",
            video.size_bytes()
        ));

        let delivered = self
            .transport
            .send_video(chat_id, video.path(), messages::VIDEO_CAPTION)
            .await;

        let job_id = video.job_id().clone();
        if let Err(e) = video.cleanup() {
            warn!(job_id = %job_id, "Failed to remove delivered video: {}", e);
        }

        delivered?;
        Ok(())
    }

    /// Put `text` in the menu message if there is one, else send it.
    async fn show(
        &self,
        chat_id: i64,
        message: Option<MessageRef>,
        text: &str,
    ) -> BotResult<MessageRef> {
        match message {
            Some(message) => {
                self.transport.edit_text(&message, text, None).await?;
                Ok(message)
            }
            None => Ok(self.transport.send_text(chat_id, text).await?),
        }
    }
}

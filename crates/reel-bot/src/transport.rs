//! Chat platform abstraction.

use std::path::Path;

use async_trait::async_trait;

use reel_models::TrackCatalog;

use crate::error::TransportResult;

/// Prefix of the choice token carried by track buttons.
pub const TRACK_TOKEN_PREFIX: &str = "music_";

/// Buttons per menu row.
const MENU_ROW_WIDTH: usize = 2;

/// A message the bot has sent and may edit later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceButton {
    pub label: String,
    pub token: String,
}

/// Inline menu attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceMenu {
    pub rows: Vec<Vec<ChoiceButton>>,
}

impl ChoiceMenu {
    /// One button per catalog track, in catalog order.
    pub fn for_tracks(catalog: &TrackCatalog) -> Self {
        let buttons: Vec<ChoiceButton> = catalog
            .iter()
            .map(|track| ChoiceButton {
                label: track.name.clone(),
                token: track_token(track.id.as_str()),
            })
            .collect();

        Self {
            rows: buttons
                .chunks(MENU_ROW_WIDTH)
                .map(|row| row.to_vec())
                .collect(),
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &ChoiceButton> {
        self.rows.iter().flatten()
    }
}

pub fn track_token(track_id: &str) -> String {
    format!("{}{}", TRACK_TOKEN_PREFIX, track_id)
}

/// Track id carried by a choice token; `None` for foreign tokens.
pub fn parse_track_token(token: &str) -> Option<&str> {
    token.strip_prefix(TRACK_TOKEN_PREFIX)
}

/// Outbound operations the orchestrator needs from a chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> TransportResult<MessageRef>;

    /// Replace the text of `message`, with `menu` attached when given.
    async fn edit_text(
        &self,
        message: &MessageRef,
        text: &str,
        menu: Option<&ChoiceMenu>,
    ) -> TransportResult<()>;

    /// Acknowledge a menu choice so the client stops its spinner.
    async fn answer_choice(&self, choice_id: &str) -> TransportResult<()>;

    /// Upload the video at `path`. The file must stay in place until this returns.
    async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> TransportResult<()>;
}

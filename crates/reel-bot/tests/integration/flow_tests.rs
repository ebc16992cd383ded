//! Conversation flows that stop short of encoding.

use reel_bot::{messages, BotCommand, BotEvent};
use reel_models::UserId;

use super::support::{solid_image, AudioBehavior, Harness, ImageOutcome, Sent, CHAT, USER};

fn harness() -> Harness {
    Harness::new(ImageOutcome::Image(solid_image(64, 64)), AudioBehavior::Timeout)
}

#[tokio::test]
async fn test_prompt_stores_session_and_offers_tracks() {
    let h = harness();
    h.prompt(USER, "a red bicycle").await;

    assert_eq!(h.generator.prompts(), vec!["a red bicycle".to_string()]);
    assert_eq!(
        h.transport.sent(),
        vec![
            Sent::Text {
                chat_id: CHAT,
                message_id: 1,
                text: messages::GENERATING_IMAGE.to_string(),
            },
            Sent::Edit {
                message_id: 1,
                text: messages::CHOOSE_TRACK.to_string(),
                with_menu: true,
            },
        ]
    );
    assert_eq!(h.orchestrator.sessions().len(), 1);
    assert_eq!(h.orchestrator.menu().buttons().count(), 3);
}

#[tokio::test]
async fn test_quota_failure_is_reported_and_no_session_kept() {
    let h = Harness::new(ImageOutcome::Quota, AudioBehavior::Timeout);
    h.prompt(USER, "a red bicycle").await;

    let last = h.transport.last_text();
    assert!(last.contains("API limits"), "{last}");
    assert!(last.contains("You can try:"));
    assert!(h.orchestrator.sessions().is_empty());
}

#[tokio::test]
async fn test_auth_and_generic_failures_have_own_messages() {
    let auth = Harness::new(ImageOutcome::Auth, AudioBehavior::Timeout);
    auth.prompt(USER, "x").await;
    assert!(auth.transport.last_text().contains("authentication error"));

    let generic = Harness::new(ImageOutcome::Generic, AudioBehavior::Timeout);
    generic.prompt(USER, "x").await;
    let last = generic.transport.last_text();
    assert!(last.contains("Failed to generate image"));
    assert!(last.contains("content policy violation"));
}

#[tokio::test]
async fn test_selection_without_session_reports_expiry() {
    let h = harness();
    h.choose(USER, "music_2", 9).await;

    assert_eq!(
        h.transport.sent(),
        vec![
            Sent::Answer("cb-music_2".to_string()),
            Sent::Edit {
                message_id: 9,
                text: "❌ Error: Session expired. Please start over.".to_string(),
                with_menu: false,
            },
        ]
    );
    assert_eq!(h.audio.calls(), 0);
}

#[tokio::test]
async fn test_session_is_consumed_by_first_selection() {
    let h = harness();
    h.prompt(USER, "a red bicycle").await;
    h.choose(USER, "music_2", 1).await;
    h.choose(USER, "music_2", 1).await;

    assert!(h.transport.last_text().contains("Session expired"));
    assert_eq!(h.audio.calls(), 1);
}

#[tokio::test]
async fn test_unknown_track_does_no_network_activity() {
    let h = harness();
    h.prompt(USER, "a red bicycle").await;
    h.choose(USER, "music_9", 1).await;

    let texts = h.transport.texts();
    assert!(texts.contains(&messages::CREATING_VIDEO.to_string()));
    assert!(h.transport.last_text().contains("Unknown music track \"9\""));
    assert_eq!(h.audio.calls(), 0);
    assert!(h.leftovers().is_empty());
    assert!(h.orchestrator.sessions().is_empty());
}

#[tokio::test]
async fn test_audio_timeout_is_reported_without_leaking_files() {
    let h = harness();
    h.prompt(USER, "a red bicycle").await;
    h.choose(USER, "music_2", 1).await;

    assert_eq!(h.audio.fetched_tracks(), vec!["Ambient".to_string()]);
    assert!(h
        .transport
        .last_text()
        .contains("Failed to download audio track"));
    assert!(h.transport.videos().is_empty());
    assert!(h.leftovers().is_empty(), "leaked {:?}", h.leftovers());
}

#[tokio::test]
async fn test_foreign_token_is_only_acknowledged() {
    let h = harness();
    h.prompt(USER, "a red bicycle").await;
    let before = h.transport.sent().len();

    h.choose(USER, "style_2", 1).await;

    let sent = h.transport.sent();
    assert_eq!(sent.len(), before + 1);
    assert_eq!(sent[before], Sent::Answer("cb-style_2".to_string()));
    assert_eq!(h.orchestrator.sessions().len(), 1);
}

#[tokio::test]
async fn test_users_keep_separate_sessions() {
    let h = harness();
    h.prompt(USER, "a red bicycle").await;

    h.choose(UserId(7), "music_1", 1).await;
    assert!(h.transport.last_text().contains("Session expired"));
    assert_eq!(h.orchestrator.sessions().len(), 1);

    let session = h.orchestrator.sessions().take(USER).unwrap();
    assert_eq!(session.prompt, "a red bicycle");
}

#[tokio::test]
async fn test_commands() {
    let h = harness();
    for (command, expected) in [
        (BotCommand::Start, messages::WELCOME),
        (BotCommand::Help, messages::HELP),
        (BotCommand::Unknown("settings".to_string()), messages::HELP),
    ] {
        h.orchestrator
            .handle(BotEvent::Command {
                chat_id: CHAT,
                user_id: USER,
                command,
            })
            .await;
        assert_eq!(h.transport.last_text(), expected);
    }
    assert!(h.generator.prompts().is_empty());
}

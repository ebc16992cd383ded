//! Full prompt-to-video runs. These encode for real and need ffmpeg/ffprobe.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reel_bot::messages;
use reel_media::probe_media;
use reel_models::{FrameSize, RenderSettings};
use tempfile::TempDir;

use super::support::{
    solid_image, AudioBehavior, Harness, ImageOutcome, RecordingTransport, Sent, CHAT, USER,
};

/// An 8 second tone standing in for a downloaded track.
async fn track_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("ambient.mp3");
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", "sine=frequency=220:duration=8"])
        .arg(&path)
        .status()
        .await
        .expect("ffmpeg not runnable");
    assert!(status.success());
    path
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_red_bicycle_to_ambient_video() {
    let fixtures = TempDir::new().unwrap();
    let track = track_fixture(fixtures.path()).await;
    let kept = TempDir::new().unwrap();

    let h = Harness::with(
        ImageOutcome::Image(solid_image(1024, 1024)),
        AudioBehavior::CopyFrom(track),
        RecordingTransport::keeping_videos_in(kept.path()),
        RenderSettings::default(),
    );

    h.prompt(USER, "a red bicycle").await;
    assert_eq!(h.orchestrator.sessions().len(), 1);

    h.choose(USER, "music_2", 1).await;

    assert_eq!(h.audio.fetched_tracks(), vec!["Ambient".to_string()]);
    assert!(h.orchestrator.sessions().is_empty());

    let videos = h.transport.videos();
    assert_eq!(videos.len(), 1, "sent: {:?}", h.transport.sent());
    let Sent::Video {
        chat_id,
        caption,
        path,
        size_bytes,
    } = &videos[0]
    else {
        unreachable!()
    };
    assert_eq!(*chat_id, CHAT);
    assert_eq!(caption, messages::VIDEO_CAPTION);
    assert!(*size_bytes > 0);

    // Delivered output deleted, nothing else left behind.
    assert!(!path.exists());
    assert!(h.leftovers().is_empty(), "leaked {:?}", h.leftovers());

    let info = probe_media(kept.path().join("delivered.mp4")).await.unwrap();
    assert!((info.duration - 5.0).abs() < 0.1, "duration {}", info.duration);
    assert!(info.has_audio());
    let video = info.video.expect("video stream");
    assert_eq!((video.width, video.height), (1024, 1024));
    assert!((video.fps - 30.0).abs() < 0.01, "fps {}", video.fps);
    assert_eq!(video.codec, "h264");
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_output_removed_when_upload_fails() {
    let fixtures = TempDir::new().unwrap();
    let track = track_fixture(fixtures.path()).await;

    let h = Harness::with(
        ImageOutcome::Image(solid_image(300, 200)),
        AudioBehavior::CopyFrom(track),
        RecordingTransport::failing_videos(),
        RenderSettings {
            duration: Duration::from_secs(1),
            fps: 10,
            frame_size: FrameSize::new(160, 160),
            ..Default::default()
        },
    );

    h.prompt(USER, "a lighthouse").await;
    h.choose(USER, "music_1", 1).await;

    assert_eq!(h.transport.videos().len(), 1);
    assert_eq!(h.transport.last_text(), messages::unexpected_error());
    assert!(h.leftovers().is_empty(), "leaked {:?}", h.leftovers());
}

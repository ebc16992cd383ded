//! Fake collaborators and a test harness.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use reel_bot::{
    BotEvent, ChatTransport, ChoiceMenu, MessageRef, Orchestrator, SessionStore, TransportError,
    TransportResult,
};
use reel_imagegen::{ImageGenError, ImageGenResult, ImageGenerator};
use reel_media::{AudioSource, MediaError, MediaResult, VideoAssembler};
use reel_models::{RenderSettings, Track, TrackCatalog, UserId};

pub const CHAT: i64 = 500;
pub const USER: UserId = UserId(42);

/// Everything the bot sent, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    Edit {
        message_id: i64,
        text: String,
        with_menu: bool,
    },
    Answer(String),
    Video {
        chat_id: i64,
        caption: String,
        path: PathBuf,
        size_bytes: u64,
    },
}

/// Transport recording every call.
///
/// Uploaded videos are copied to `keep_dir` (when set) so tests can inspect
/// them after the bot has deleted its output.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    keep_dir: Option<PathBuf>,
    fail_videos: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keeping_videos_in(dir: &Path) -> Self {
        Self {
            keep_dir: Some(dir.to_path_buf()),
            ..Self::default()
        }
    }

    pub fn failing_videos() -> Self {
        Self {
            fail_videos: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts of sends and edits, in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } | Sent::Edit { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> String {
        self.texts().pop().unwrap_or_default()
    }

    pub fn videos(&self) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| matches!(s, Sent::Video { .. }))
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> TransportResult<MessageRef> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(Sent::Text {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(MessageRef {
            chat_id,
            message_id,
        })
    }

    async fn edit_text(
        &self,
        message: &MessageRef,
        text: &str,
        menu: Option<&ChoiceMenu>,
    ) -> TransportResult<()> {
        self.record(Sent::Edit {
            message_id: message.message_id,
            text: text.to_string(),
            with_menu: menu.is_some(),
        });
        Ok(())
    }

    async fn answer_choice(&self, choice_id: &str) -> TransportResult<()> {
        self.record(Sent::Answer(choice_id.to_string()));
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> TransportResult<()> {
        let size_bytes = std::fs::metadata(path)?.len();
        if let Some(dir) = &self.keep_dir {
            std::fs::copy(path, dir.join("delivered.mp4"))?;
        }
        self.record(Sent::Video {
            chat_id,
            caption: caption.to_string(),
            path: path.to_path_buf(),
            size_bytes,
        });
        if self.fail_videos {
            return Err(TransportError::api(413, "Request Entity Too Large"));
        }
        Ok(())
    }
}

/// What the fake generator answers.
pub enum ImageOutcome {
    Image(DynamicImage),
    Quota,
    Auth,
    Generic,
}

pub struct FakeGenerator {
    outcome: ImageOutcome,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(outcome: ImageOutcome) -> Self {
        Self {
            outcome,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> ImageGenResult<DynamicImage> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.outcome {
            ImageOutcome::Image(image) => Ok(image.clone()),
            ImageOutcome::Quota => Err(ImageGenError::QuotaExceeded(
                "Billing hard limit has been reached".to_string(),
            )),
            ImageOutcome::Auth => Err(ImageGenError::AuthFailed(
                "Incorrect API key provided".to_string(),
            )),
            ImageOutcome::Generic => Err(ImageGenError::failed("content policy violation")),
        }
    }
}

/// What the fake audio source does.
pub enum AudioBehavior {
    Timeout,
    CopyFrom(PathBuf),
}

pub struct FakeAudio {
    behavior: AudioBehavior,
    calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl FakeAudio {
    pub fn new(behavior: AudioBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fetched_tracks(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSource for FakeAudio {
    async fn fetch(&self, track: &Track, dest: &Path) -> MediaResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(track.name.clone());
        match &self.behavior {
            AudioBehavior::Timeout => Err(MediaError::audio_timeout(format!(
                "no complete response from {} within 30s",
                track.url
            ))),
            AudioBehavior::CopyFrom(src) => Ok(tokio::fs::copy(src, dest).await?),
        }
    }
}

pub fn solid_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([200, (x % 256) as u8, (y % 256) as u8])
    }))
}

/// Orchestrator wired to fakes, with its own work directory.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub transport: Arc<RecordingTransport>,
    pub generator: Arc<FakeGenerator>,
    pub audio: Arc<FakeAudio>,
    pub work_dir: TempDir,
}

impl Harness {
    pub fn new(image: ImageOutcome, audio: AudioBehavior) -> Self {
        Self::with(image, audio, RecordingTransport::new(), RenderSettings::default())
    }

    pub fn with(
        image: ImageOutcome,
        audio: AudioBehavior,
        transport: RecordingTransport,
        settings: RenderSettings,
    ) -> Self {
        let work_dir = TempDir::new().unwrap();
        let transport = Arc::new(transport);
        let generator = Arc::new(FakeGenerator::new(image));
        let audio = Arc::new(FakeAudio::new(audio));

        let assembler = Arc::new(VideoAssembler::new(
            settings,
            Arc::new(TrackCatalog::builtin()),
            audio.clone(),
            work_dir.path(),
        ));
        let orchestrator = Orchestrator::new(
            SessionStore::new(),
            generator.clone(),
            assembler,
            transport.clone(),
        );

        Self {
            orchestrator,
            transport,
            generator,
            audio,
            work_dir,
        }
    }

    pub async fn prompt(&self, user_id: UserId, text: &str) {
        self.orchestrator
            .handle(BotEvent::Prompt {
                chat_id: CHAT,
                user_id,
                text: text.to_string(),
            })
            .await;
    }

    /// Press a menu button on message `menu_message_id`.
    pub async fn choose(&self, user_id: UserId, token: &str, menu_message_id: i64) {
        self.orchestrator
            .handle(BotEvent::TrackSelected {
                chat_id: CHAT,
                user_id,
                choice_id: format!("cb-{}", token),
                message: Some(MessageRef {
                    chat_id: CHAT,
                    message_id: menu_message_id,
                }),
                token: token.to_string(),
            })
            .await;
    }

    /// Files and directories left in the work directory.
    pub fn leftovers(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.work_dir.path())
            .map(|entries| entries.map(|e| e.unwrap().path()).collect())
            .unwrap_or_default()
    }
}

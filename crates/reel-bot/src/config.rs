//! Bot configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use reel_imagegen::OpenAiConfig;
use reel_media::DEFAULT_AUDIO_FETCH_TIMEOUT;
use reel_models::{EncodingConfig, FrameSize, RenderSettings, TrackCatalog};

use crate::error::{BotError, BotResult};
use crate::telegram::TelegramConfig;

/// Bot configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    pub openai: OpenAiConfig,
    /// Parameters shared by every render job
    pub render: RenderSettings,
    /// Bound on a whole track download
    pub audio_fetch_timeout: Duration,
    /// Root for temporary render artifacts
    pub work_dir: PathBuf,
    /// JSON catalog replacing the built-in tracks
    pub track_catalog_path: Option<PathBuf>,
    /// Maximum session age; unset keeps sessions until used
    pub session_ttl: Option<Duration>,
    /// Time allowed for in-flight events after shutdown is requested
    pub shutdown_timeout: Duration,
    /// Port of the Prometheus exporter; unset disables it
    pub metrics_port: Option<u16>,
}

impl BotConfig {
    /// Create config from environment variables.
    ///
    /// Fails when a required credential is missing or the render settings
    /// cannot be encoded.
    pub fn from_env() -> BotResult<Self> {
        let telegram = TelegramConfig::from_env().map_err(|e| BotError::config(e.to_string()))?;
        let openai = OpenAiConfig::from_env().map_err(|e| BotError::config(e.to_string()))?;

        Ok(Self {
            telegram,
            openai,
            render: render_settings_from_env()?,
            audio_fetch_timeout: env_parse::<u64>("AUDIO_FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_AUDIO_FETCH_TIMEOUT),
            work_dir: std::env::var("RENDER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("reelbot")),
            track_catalog_path: std::env::var("TRACK_CATALOG_PATH").ok().map(PathBuf::from),
            session_ttl: env_parse::<u64>("SESSION_TTL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            shutdown_timeout: Duration::from_secs(
                env_parse("SHUTDOWN_TIMEOUT_SECS").unwrap_or(30),
            ),
            metrics_port: env_parse("METRICS_PORT"),
        })
    }

    /// The configured catalog file, or the built-in tracks.
    pub fn load_catalog(&self) -> BotResult<TrackCatalog> {
        match &self.track_catalog_path {
            Some(path) => TrackCatalog::load(path).map_err(|e| {
                BotError::config(format!("track catalog {}: {}", path.display(), e))
            }),
            None => Ok(TrackCatalog::builtin()),
        }
    }
}

/// Render settings from `VIDEO_*` and `ENCODE_*` variables.
pub fn render_settings_from_env() -> BotResult<RenderSettings> {
    let defaults = RenderSettings::default();
    let encoding = EncodingConfig::default();

    let settings = RenderSettings {
        duration: env_parse::<u64>("VIDEO_DURATION_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.duration),
        fps: env_parse("VIDEO_FPS").unwrap_or(defaults.fps),
        frame_size: FrameSize::new(
            env_parse("VIDEO_WIDTH").unwrap_or(defaults.frame_size.width),
            env_parse("VIDEO_HEIGHT").unwrap_or(defaults.frame_size.height),
        ),
        max_zoom: env_parse("VIDEO_MAX_ZOOM").unwrap_or(defaults.max_zoom),
        encoding: EncodingConfig {
            crf: env_parse("ENCODE_CRF").unwrap_or(encoding.crf),
            preset: std::env::var("ENCODE_PRESET").unwrap_or(encoding.preset),
            ..encoding
        },
    };

    settings
        .validate()
        .map_err(|e| BotError::config(format!("render settings: {}", e)))?;
    Ok(settings)
}

/// Parse an optional variable; unparsable values are logged and ignored.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}

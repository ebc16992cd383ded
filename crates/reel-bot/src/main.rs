//! Bot binary.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::sync::watch;
use tracing::{info, warn};

use reel_bot::telegram::{Poller, TelegramClient};
use reel_bot::{init_tracing, metrics, BotConfig, LogFormat, Orchestrator, SessionStore};
use reel_imagegen::OpenAiImageClient;
use reel_media::{check_ffmpeg, check_ffprobe, HttpAudioSource, VideoAssembler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    info!("Starting reel-bot");

    let config = BotConfig::from_env().context("Invalid configuration")?;
    info!(
        duration_secs = config.render.duration_secs(),
        fps = config.render.fps,
        frame_size = %config.render.frame_size,
        work_dir = %config.work_dir.display(),
        session_ttl_secs = config.session_ttl.map(|t| t.as_secs()),
        "Loaded configuration"
    );

    check_ffmpeg().context("ffmpeg is required to render videos")?;
    if let Err(e) = check_ffprobe() {
        warn!("{}; track lengths will not be logged", e);
    }

    if let Some(port) = config.metrics_port {
        metrics::init_metrics(port).context("Failed to start metrics exporter")?;
        info!(port, "Metrics exporter listening");
    }

    let catalog = Arc::new(config.load_catalog()?);
    info!(tracks = catalog.len(), "Track catalog loaded");

    let audio = Arc::new(HttpAudioSource::new(config.audio_fetch_timeout)?);
    let assembler = Arc::new(VideoAssembler::new(
        config.render.clone(),
        catalog,
        audio,
        config.work_dir.clone(),
    ));
    let images = Arc::new(OpenAiImageClient::new(config.openai.clone())?);

    let telegram = Arc::new(TelegramClient::new(config.telegram.clone())?);
    let me = telegram
        .get_me()
        .await
        .context("Telegram rejected the bot token")?;
    info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or_default(),
        "Connected to Telegram"
    );

    let sessions = SessionStore::with_ttl(config.session_ttl);
    let orchestrator = Arc::new(Orchestrator::new(
        sessions.clone(),
        images,
        assembler,
        telegram.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = config
        .session_ttl
        .map(|ttl| sessions.spawn_sweeper(ttl, shutdown_rx.clone()));

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(true).ok();
    });

    Poller::new(telegram, orchestrator, config.shutdown_timeout)
        .run(shutdown_rx)
        .await;

    if let Some(sweeper) = sweeper {
        sweeper.await.ok();
    }

    info!("Bot shutdown complete");
    Ok(())
}

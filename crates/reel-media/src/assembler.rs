//! Video assembly: a zoom animation over a still image, muxed with a
//! background track.
//!
//! One call to [`VideoAssembler::create_video`] is one render job:
//!
//! 1. resolve the track in the catalog (no I/O before this succeeds)
//! 2. download the track into the job's scratch directory
//! 3. render zoom frames in parallel and stream them into FFmpeg
//! 4. cut the looped track to the clip duration and mux it with the frames
//! 5. encode H.264/AAC into an MP4 output file
//!
//! The scratch directory is removed before returning on every path. The
//! output survives only on success, owned by the returned [`RenderedVideo`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use rayon::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use reel_models::{RenderJobId, RenderSettings, Track, TrackCatalog};

use crate::artifacts::{RenderWorkspace, RenderedVideo};
use crate::audio::AudioSource;
use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;
use crate::progress::FfmpegProgress;
use crate::zoom::{fit_to_frame, ZoomEffect};

/// Rendered frames buffered ahead of the encoder.
const FRAME_QUEUE_DEPTH: usize = 8;

/// Renders still images into short music-backed clips.
pub struct VideoAssembler {
    settings: RenderSettings,
    catalog: Arc<TrackCatalog>,
    audio: Arc<dyn AudioSource>,
    work_dir: PathBuf,
}

impl VideoAssembler {
    /// Create an assembler writing its artifacts under `work_dir`.
    pub fn new(
        settings: RenderSettings,
        catalog: Arc<TrackCatalog>,
        audio: Arc<dyn AudioSource>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            catalog,
            audio,
            work_dir: work_dir.into(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Render `image` with the track identified by `track_id`.
    pub async fn create_video(
        &self,
        image: &DynamicImage,
        track_id: &str,
    ) -> MediaResult<RenderedVideo> {
        let track = self
            .catalog
            .get(track_id)
            .ok_or_else(|| MediaError::TrackNotFound(track_id.to_string()))?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidImage(format!(
                "source image is {}x{}",
                width, height
            )));
        }

        let job_id = RenderJobId::new();
        let span = info_span!("render_job", job_id = %job_id, track_id = %track.id);
        self.run_job(job_id, image, track).instrument(span).await
    }

    async fn run_job(
        &self,
        job_id: RenderJobId,
        image: &DynamicImage,
        track: &Track,
    ) -> MediaResult<RenderedVideo> {
        let started = Instant::now();
        info!(
            track = %track.name,
            duration_secs = self.settings.duration_secs(),
            fps = self.settings.fps,
            frame_size = %self.settings.frame_size,
            "Render job started"
        );

        let workspace = RenderWorkspace::create(&self.work_dir, &job_id)?;
        let result = self.render(&workspace, &job_id, image, track).await;
        workspace.close();

        match &result {
            Ok(video) => info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                size_bytes = video.size_bytes(),
                "Render job completed"
            ),
            Err(e) => warn!(
                stage = %e.stage(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Render job failed: {}", e
            ),
        }

        result
    }

    async fn render(
        &self,
        workspace: &RenderWorkspace,
        job_id: &RenderJobId,
        image: &DynamicImage,
        track: &Track,
    ) -> MediaResult<RenderedVideo> {
        let audio_path = workspace.audio_path(track);
        self.audio.fetch(track, &audio_path).await?;
        self.log_track_length(&audio_path).await;

        // Dropped (and deleted) on any early return below.
        let output = RenderWorkspace::allocate_output(&self.work_dir, job_id)?;
        let cmd = encode_command(&self.settings, &audio_path, &output);
        debug!(output = %cmd.output_path().display(), "Encoding clip");

        let effect = ZoomEffect::new(
            fit_to_frame(image, self.settings.frame_size),
            self.settings.duration_secs(),
            self.settings.max_zoom,
        );
        let total_frames = self.settings.total_frames();
        let settings = self.settings.clone();
        let (tx, rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let producer = tokio::task::spawn_blocking(move || render_frames(&effect, &settings, tx));

        let encoded = FfmpegRunner::new()
            .run_with_frames(&cmd, rx, progress_logger(job_id.clone(), total_frames))
            .await;
        let produced = producer.await;

        encoded?;
        let produced = produced
            .map_err(|e| MediaError::internal(format!("Frame renderer failed: {}", e)))?;
        if produced != total_frames {
            return Err(MediaError::encoding_failed(
                format!("only {} of {} frames were rendered", produced, total_frames),
                None,
                None,
            ));
        }

        let size_bytes = tokio::fs::metadata(&output).await?.len();
        if size_bytes == 0 {
            return Err(MediaError::encoding_failed(
                "FFmpeg produced an empty file",
                None,
                None,
            ));
        }

        Ok(RenderedVideo::new(output, job_id.clone(), size_bytes))
    }

    /// Log whether the track will be looped. Probing is best effort.
    async fn log_track_length(&self, audio_path: &Path) {
        let clip_secs = self.settings.duration_secs();
        match probe_media(audio_path).await {
            Ok(info) if info.duration > 0.0 && info.duration < clip_secs => info!(
                track_secs = info.duration,
                clip_secs, "Track is shorter than the clip, looping it"
            ),
            Ok(info) => debug!(track_secs = info.duration, "Probed track length"),
            Err(e) => debug!("Could not probe track length: {}", e),
        }
    }
}

/// FFmpeg invocation for one clip.
///
/// Input 0 is the raw frame stream on stdin. Input 1 is the track, read from
/// offset 0 and looped so that a track shorter than the clip still covers it;
/// `-t` then cuts the output to exactly the clip duration.
fn encode_command(settings: &RenderSettings, audio: &Path, output: &Path) -> FfmpegCommand {
    let encoding = &settings.encoding;
    FfmpegCommand::new(output)
        .input(FfmpegInput::stdin().raw_rgb_frames(settings.frame_size, settings.fps))
        .input(FfmpegInput::file(audio).stream_loop(-1))
        .map("0:v:0")
        .map("1:a:0")
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        .pixel_format(&encoding.pixel_format)
        .frame_rate(settings.fps)
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate)
        .duration(settings.duration_secs())
        .faststart()
}

/// Render every frame of the clip in order, in parallel batches.
///
/// Returns the number of frames handed to the encoder; fewer than the total
/// means the encoder went away.
fn render_frames(
    effect: &ZoomEffect,
    settings: &RenderSettings,
    tx: mpsc::Sender<Vec<u8>>,
) -> u64 {
    let total = settings.total_frames() as usize;
    let batch = rayon::current_num_threads().max(1);
    let mut sent = 0u64;

    for start in (0..total).step_by(batch) {
        let end = (start + batch).min(total);
        let frames: Vec<Vec<u8>> = (start..end)
            .into_par_iter()
            .map(|i| effect.frame_at(settings.frame_time(i as u64)).into_raw())
            .collect();

        for frame in frames {
            if tx.blocking_send(frame).is_err() {
                debug!(sent, "Encoder stopped accepting frames");
                return sent;
            }
            sent += 1;
        }
    }

    sent
}

/// Progress callback logging each completed quarter of the clip.
fn progress_logger(
    job_id: RenderJobId,
    total_frames: u64,
) -> impl Fn(FfmpegProgress) + Send + 'static {
    let last_quarter = AtomicU64::new(0);
    move |progress: FfmpegProgress| {
        let quarter = (progress.percentage(total_frames) / 25.0) as u64;
        if quarter > last_quarter.fetch_max(quarter, Ordering::Relaxed) {
            debug!(
                job_id = %job_id,
                frame = progress.frame,
                percent = quarter * 25,
                speed = progress.speed,
                "Encoding progress"
            );
        }
    }
}

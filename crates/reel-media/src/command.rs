//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use reel_models::FrameSize;

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Number of non-progress stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// One `-i` input together with the options that precede it.
#[derive(Debug, Clone)]
pub struct FfmpegInput {
    args: Vec<String>,
    source: String,
}

impl FfmpegInput {
    /// Read from a file.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            args: Vec::new(),
            source: path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// Read from the runner's stdin feed.
    pub fn stdin() -> Self {
        Self {
            args: Vec::new(),
            source: "pipe:0".to_string(),
        }
    }

    /// Add an input option.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Declare packed RGB24 frames of `size` at `fps`.
    pub fn raw_rgb_frames(self, size: FrameSize, fps: u32) -> Self {
        self.arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-s")
            .arg(size.to_string())
            .arg("-framerate")
            .arg(fps.to_string())
    }

    /// Repeat the input `count` times; `-1` loops forever.
    pub fn stream_loop(self, count: i32) -> Self {
        self.arg("-stream_loop").arg(count.to_string())
    }

    fn reads_stdin(&self) -> bool {
        self.source == "pipe:0" || self.source == "-"
    }
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after every -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Append an input.
    pub fn input(mut self, input: FfmpegInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Select a stream for the output (e.g. "0:v").
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Cut the output at `seconds`.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Move the MP4 index to the front so playback can start while downloading.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Output file path.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Whether any input is fed through stdin.
    pub fn reads_stdin(&self) -> bool {
        self.inputs.iter().any(FfmpegInput::reads_stdin)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner that spawns FFmpeg and feeds its stdin.
#[derive(Debug, Default)]
pub struct FfmpegRunner;

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self
    }

    /// Run `cmd`, writing every buffer received on `frames` to FFmpeg's stdin.
    ///
    /// Stdin is closed once the channel is drained, which ends the piped
    /// input. If FFmpeg exits early the channel receiver is dropped, so a
    /// producer blocked on `send` observes the failure and stops.
    pub async fn run_with_frames<F>(
        &self,
        cmd: &FfmpegCommand,
        mut frames: mpsc::Receiver<Vec<u8>>,
        progress_callback: F,
    ) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let stdin_mode = if cmd.reads_stdin() {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(stdin_mode)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let stderr_handle = tokio::spawn(drain_stderr(stderr, progress_callback));

        let feed_result = match child.stdin.take() {
            Some(mut stdin) => {
                let mut result = Ok(());
                while let Some(frame) = frames.recv().await {
                    if let Err(e) = stdin.write_all(&frame).await {
                        result = Err(e);
                        break;
                    }
                }
                // Dropping stdin signals end of input.
                drop(stdin);
                result
            }
            None => Ok(()),
        };
        drop(frames);

        let status = child.wait().await?;
        let stderr_tail = stderr_handle.await.unwrap_or_default();

        if !status.success() {
            return Err(MediaError::encoding_failed(
                summarize(&stderr_tail, "FFmpeg exited with non-zero status"),
                Some(stderr_tail),
                status.code(),
            ));
        }

        if let Err(e) = feed_result {
            warn!("FFmpeg exited successfully but stdin feed failed: {}", e);
            return Err(MediaError::encoding_failed(
                format!("Failed to stream frames to FFmpeg: {}", e),
                Some(stderr_tail),
                status.code(),
            ));
        }

        Ok(())
    }
}

/// Read stderr to the end, forwarding progress and keeping the last
/// diagnostic lines.
async fn drain_stderr<F>(stderr: ChildStderr, progress_callback: F) -> String
where
    F: Fn(FfmpegProgress) + Send + 'static,
{
    let mut reader = BufReader::new(stderr).lines();
    let mut current = FfmpegProgress::default();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    while let Ok(Some(line)) = reader.next_line().await {
        if FfmpegProgress::is_progress_line(&line) {
            if let Some(snapshot) = current.apply_line(&line) {
                progress_callback(snapshot);
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    Vec::from(tail).join("\n")
}

/// Last diagnostic line, or `fallback` when FFmpeg printed nothing.
fn summarize(stderr_tail: &str, fallback: &str) -> String {
    stderr_tail
        .lines()
        .last()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

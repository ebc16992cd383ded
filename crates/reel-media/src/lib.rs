#![deny(unreachable_patterns)]
//! Video assembly for reelbot.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - A stateless zoom frame generator over a still image
//! - Background track retrieval with a bounded timeout
//! - The video assembler, which streams rendered frames into FFmpeg,
//!   muxes the trimmed track and owns every temporary artifact it creates

pub mod artifacts;
pub mod assembler;
pub mod audio;
pub mod command;
pub mod error;
pub mod probe;
pub mod progress;
pub mod zoom;

pub use artifacts::{RenderWorkspace, RenderedVideo};
pub use assembler::VideoAssembler;
pub use audio::{AudioSource, HttpAudioSource, DEFAULT_AUDIO_FETCH_TIMEOUT};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use error::{AudioFailure, MediaError, MediaResult, RenderStage};
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use zoom::{fit_to_frame, zoom_factor, ZoomEffect};

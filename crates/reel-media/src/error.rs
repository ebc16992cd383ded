//! Error types for media operations.

use std::fmt;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Why a background track could not be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFailure {
    /// The request did not finish within the fetch timeout.
    Timeout,
    /// Transport error, non-success status or unusable body.
    Fetch,
}

impl AudioFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFailure::Timeout => "timeout",
            AudioFailure::Fetch => "fetch",
        }
    }
}

impl fmt::Display for AudioFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    TrackLookup,
    AudioRetrieval,
    Encoding,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::TrackLookup => "track_lookup",
            RenderStage::AudioRetrieval => "audio_retrieval",
            RenderStage::Encoding => "encoding",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during video assembly.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("No such track: {0}")]
    TrackNotFound(String),

    #[error("Audio retrieval failed ({kind}): {message}")]
    AudioRetrievalFailed { kind: AudioFailure, message: String },

    #[error("Video encoding failed: {message}")]
    EncodingFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid source image: {0}")]
    InvalidImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an audio timeout error.
    pub fn audio_timeout(message: impl Into<String>) -> Self {
        Self::AudioRetrievalFailed {
            kind: AudioFailure::Timeout,
            message: message.into(),
        }
    }

    /// Create an audio fetch failure error.
    pub fn audio_fetch_failed(message: impl Into<String>) -> Self {
        Self::AudioRetrievalFailed {
            kind: AudioFailure::Fetch,
            message: message.into(),
        }
    }

    /// Create an encoding failure error.
    pub fn encoding_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodingFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stage of the render pipeline this error belongs to.
    ///
    /// Anything that is neither a catalog miss nor a retrieval failure
    /// happened while producing the output file.
    pub fn stage(&self) -> RenderStage {
        match self {
            MediaError::TrackNotFound(_) => RenderStage::TrackLookup,
            MediaError::AudioRetrievalFailed { .. } => RenderStage::AudioRetrieval,
            _ => RenderStage::Encoding,
        }
    }
}

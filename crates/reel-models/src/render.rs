//! Render settings shared by every render job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::encoding::EncodingConfig;

/// Default clip length in seconds.
pub const DEFAULT_DURATION_SECS: u64 = 5;
/// Default frame rate.
pub const DEFAULT_FPS: u32 = 30;
/// Default output frame edge (square output).
pub const DEFAULT_FRAME_EDGE: u32 = 1024;
/// Default magnification reached at the end of the clip (10%).
pub const DEFAULT_MAX_ZOOM: f64 = 1.10;

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bytes in one packed RGB24 frame of this size.
    pub fn rgb24_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_EDGE, DEFAULT_FRAME_EDGE)
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Invalid render settings.
#[derive(Debug, Error, PartialEq)]
pub enum RenderSettingsError {
    #[error("Duration must be positive")]
    ZeroDuration,

    #[error("Frame rate must be positive")]
    ZeroFps,

    #[error("Frame size {0} must be non-zero and even in both dimensions")]
    InvalidFrameSize(FrameSize),

    #[error("Maximum zoom must be a finite value >= 1.0, got {0}")]
    InvalidZoom(f64),

    #[error("Unsupported encoder settings: crf {crf}, preset {preset:?}")]
    InvalidEncoding { crf: u8, preset: String },
}

/// Immutable parameters applied to every render job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Clip duration
    pub duration: Duration,
    /// Output frame rate
    pub fps: u32,
    /// Output frame size
    pub frame_size: FrameSize,
    /// Zoom factor reached at `t = duration`
    pub max_zoom: f64,
    /// Encoder parameters
    #[serde(default)]
    pub encoding: EncodingConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            fps: DEFAULT_FPS,
            frame_size: FrameSize::default(),
            max_zoom: DEFAULT_MAX_ZOOM,
            encoding: EncodingConfig::default(),
        }
    }
}

impl RenderSettings {
    /// Check the settings are usable by the encoder.
    ///
    /// H.264 with 4:2:0 chroma needs even frame dimensions.
    pub fn validate(&self) -> Result<(), RenderSettingsError> {
        if self.duration.is_zero() {
            return Err(RenderSettingsError::ZeroDuration);
        }
        if self.fps == 0 {
            return Err(RenderSettingsError::ZeroFps);
        }
        let FrameSize { width, height } = self.frame_size;
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(RenderSettingsError::InvalidFrameSize(self.frame_size));
        }
        if !self.max_zoom.is_finite() || self.max_zoom < 1.0 {
            return Err(RenderSettingsError::InvalidZoom(self.max_zoom));
        }
        if !self.encoding.is_valid() {
            return Err(RenderSettingsError::InvalidEncoding {
                crf: self.encoding.crf,
                preset: self.encoding.preset.clone(),
            });
        }
        Ok(())
    }

    /// Duration in fractional seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Number of frames in one clip.
    pub fn total_frames(&self) -> u64 {
        (self.duration_secs() * self.fps as f64).round() as u64
    }

    /// Presentation time of frame `index` in seconds.
    pub fn frame_time(&self, index: u64) -> f64 {
        index as f64 / self.fps as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bot_output() {
        let settings = RenderSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.total_frames(), 150);
        assert_eq!(settings.frame_size.to_string(), "1024x1024");
        assert_eq!(settings.frame_size.rgb24_len(), 1024 * 1024 * 3);
    }

    #[test]
    fn test_frame_time() {
        let settings = RenderSettings::default();
        assert_eq!(settings.frame_time(0), 0.0);
        assert!((settings.frame_time(15) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut settings = RenderSettings {
            duration: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(RenderSettingsError::ZeroDuration));

        settings.duration = Duration::from_secs(5);
        settings.fps = 0;
        assert_eq!(settings.validate(), Err(RenderSettingsError::ZeroFps));

        settings.fps = 30;
        settings.frame_size = FrameSize::new(1023, 1024);
        assert!(matches!(
            settings.validate(),
            Err(RenderSettingsError::InvalidFrameSize(_))
        ));

        settings.frame_size = FrameSize::default();
        settings.max_zoom = 0.9;
        assert!(matches!(
            settings.validate(),
            Err(RenderSettingsError::InvalidZoom(_))
        ));
    }
}

//! Slow zoom-in over a still image.
//!
//! Every frame is a pure function of its timestamp, so frames can be
//! rendered in any order and at any frame rate.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};

use reel_models::FrameSize;

/// Zoom factor at time `t` of a clip lasting `duration` seconds.
///
/// Rises linearly from 1.0 at `t = 0` to `max_zoom` at `t = duration`.
/// Times outside the clip are clamped to its bounds.
pub fn zoom_factor(t: f64, duration: f64, max_zoom: f64) -> f64 {
    if duration <= 0.0 || !t.is_finite() {
        return 1.0;
    }
    let progress = (t / duration).clamp(0.0, 1.0);
    1.0 + progress * (max_zoom - 1.0)
}

/// Fit an arbitrary image to the output frame.
///
/// Scales to cover the frame and crops the overflow around the center,
/// so nothing is stretched. Images already at the frame size pass through.
pub fn fit_to_frame(image: &DynamicImage, size: FrameSize) -> RgbImage {
    if image.dimensions() == (size.width, size.height) {
        return image.to_rgb8();
    }
    image
        .resize_to_fill(size.width, size.height, FilterType::Lanczos3)
        .to_rgb8()
}

/// Frame generator for the zoom animation.
#[derive(Debug, Clone)]
pub struct ZoomEffect {
    source: RgbImage,
    duration: f64,
    max_zoom: f64,
}

impl ZoomEffect {
    pub fn new(source: RgbImage, duration: f64, max_zoom: f64) -> Self {
        Self {
            source,
            duration,
            max_zoom,
        }
    }

    /// Dimensions shared by the source and every frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.source.dimensions()
    }

    pub fn factor_at(&self, t: f64) -> f64 {
        zoom_factor(t, self.duration, self.max_zoom)
    }

    /// Render the frame shown at time `t`.
    ///
    /// The source is enlarged by the zoom factor with a Lanczos filter and
    /// the center is cut back out at the source dimensions.
    pub fn frame_at(&self, t: f64) -> RgbImage {
        let (width, height) = self.source.dimensions();
        let zoom = self.factor_at(t);

        let zoomed_width = ((width as f64 * zoom) as u32).max(width);
        let zoomed_height = ((height as f64 * zoom) as u32).max(height);
        if zoomed_width == width && zoomed_height == height {
            return self.source.clone();
        }

        let zoomed = imageops::resize(
            &self.source,
            zoomed_width,
            zoomed_height,
            FilterType::Lanczos3,
        );
        let x = (zoomed_width - width) / 2;
        let y = (zoomed_height - height) / 2;
        imageops::crop_imm(&zoomed, x, y, width, height).to_image()
    }
}

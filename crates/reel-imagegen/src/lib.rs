//! Prompt-to-image generation.
//!
//! [`ImageGenerator`] is the seam the bot talks to; [`OpenAiImageClient`]
//! implements it on top of the OpenAI Images API.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;
use image::DynamicImage;

pub use client::{OpenAiConfig, OpenAiImageClient};
pub use error::{ImageGenError, ImageGenFailure, ImageGenResult};
pub use types::{ApiErrorBody, ApiErrorDetail, ImageData, ImageRequest, ImageResponse};

/// Turns a text prompt into a bitmap.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> ImageGenResult<DynamicImage>;
}

//! OpenAI Images HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, GenericImageView};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{ImageGenError, ImageGenResult};
use crate::types::{ApiErrorBody, ImageRequest, ImageResponse};
use crate::ImageGenerator;

/// Configuration for the Images API client.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Base URL, without the `/v1` suffix
    pub base_url: String,
    pub model: String,
    /// Requested size, e.g. "1024x1024"
    pub size: String,
    /// Covers generation and the image download
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("size", &self.size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl OpenAiConfig {
    /// Create config from environment variables.
    ///
    /// `OPENAI_API_KEY` is required; everything else falls back to defaults.
    pub fn from_env() -> ImageGenResult<Self> {
        let defaults = Self::default();
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ImageGenError::Config("OPENAI_API_KEY is not set".to_string()))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_API_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OPENAI_IMAGE_MODEL").unwrap_or(defaults.model),
            size: std::env::var("OPENAI_IMAGE_SIZE").unwrap_or(defaults.size),
            timeout: std::env::var("OPENAI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }
}

/// Client for `POST /v1/images/generations`.
pub struct OpenAiImageClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiImageClient {
    pub fn new(config: OpenAiConfig) -> ImageGenResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ImageGenError::Config("API key is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ImageGenError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ImageGenResult<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    async fn request_image(&self, prompt: &str) -> ImageGenResult<Vec<u8>> {
        let url = format!(
            "{}/v1/images/generations",
            self.config.base_url.trim_end_matches('/')
        );
        let request = ImageRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.config.size.clone(),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .map(|b| b.error);
            let err = ImageGenError::from_api_response(status.as_u16(), detail, &body);
            warn!(status = status.as_u16(), kind = %err.kind(), "Images API error: {}", err);
            return Err(err);
        }

        let body = response.bytes().await?;
        let parsed: ImageResponse = serde_json::from_slice(&body)?;
        let data = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ImageGenError::failed("response contained no image"))?;

        if let Some(revised) = &data.revised_prompt {
            debug!(revised_prompt = %revised, "Prompt was revised by the service");
        }

        match (data.b64_json, data.url) {
            (Some(b64), _) => STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| ImageGenError::invalid_image(format!("bad base64: {}", e))),
            (None, Some(url)) => self.download(&url).await,
            (None, None) => Err(ImageGenError::failed("response carried neither url nor data")),
        }
    }

    async fn download(&self, url: &str) -> ImageGenResult<Vec<u8>> {
        debug!("Downloading generated image");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageGenError::failed(format!(
                "image download returned {}",
                status
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate(&self, prompt: &str) -> ImageGenResult<DynamicImage> {
        info!(
            model = %self.config.model,
            size = %self.config.size,
            prompt_chars = prompt.chars().count(),
            "Generating image"
        );

        let bytes = self.request_image(prompt).await?;
        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| ImageGenError::failed(format!("decoder task failed: {}", e)))?
            .map_err(|e| ImageGenError::invalid_image(e.to_string()))?;

        let (width, height) = image.dimensions();
        info!(width, height, "Image generated");
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageGenFailure;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 20, 20])));
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn client_for(server: &MockServer) -> OpenAiImageClient {
        OpenAiImageClient::new(OpenAiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com");
        assert_eq!(config.model, "dall-e-3");
        assert_eq!(config.size, "1024x1024");
        assert!(OpenAiImageClient::new(config).is_err());

        let config = OpenAiConfig {
            api_key: "sk-secret".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_generate_inline_image() {
        let server = MockServer::start().await;
        let b64 = STANDARD.encode(png_bytes(64, 48));
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "dall-e-3",
                "prompt": "a red bicycle",
                "n": 1,
                "size": "1024x1024"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "created": 1,
                "data": [{ "b64_json": b64 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let image = client_for(&server).generate("a red bicycle").await.unwrap();
        assert_eq!((image.width(), image.height()), (64, 48));
    }

    #[tokio::test]
    async fn test_generate_downloads_hosted_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "url": format!("{}/files/img.png", server.uri()) }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(32, 32)))
            .expect(1)
            .mount(&server)
            .await;

        let image = client_for(&server).generate("a lighthouse").await.unwrap();
        assert_eq!(image.width(), 32);
    }

    #[tokio::test]
    async fn test_billing_limit_is_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": "billing_hard_limit_reached",
                    "message": "Billing hard limit has been reached",
                    "type": "invalid_request_error"
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert_eq!(err.kind(), ImageGenFailure::Quota);
    }

    #[tokio::test]
    async fn test_invalid_key_is_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {
                    "code": "invalid_api_key",
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error"
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert_eq!(err.kind(), ImageGenFailure::Auth);
    }

    #[tokio::test]
    async fn test_failed_download_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "url": format!("{}/gone.png", server.uri()) }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert_eq!(err.kind(), ImageGenFailure::Generic);
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_invalid_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "b64_json": STANDARD.encode(b"not an image") }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert!(matches!(err, ImageGenError::InvalidImage(_)));
    }
}

//! Background track retrieval.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use reel_models::Track;

use crate::error::{MediaError, MediaResult};

/// Default bound on a whole track download.
pub const DEFAULT_AUDIO_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of background track audio.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Store the audio of `track` at `dest` and return the byte count.
    ///
    /// Failures must be reported as [`MediaError::AudioRetrievalFailed`].
    async fn fetch(&self, track: &Track, dest: &Path) -> MediaResult<u64>;
}

/// Fetches tracks over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpAudioSource {
    http: Client,
    timeout: Duration,
}

impl HttpAudioSource {
    /// Create a source whose requests, body included, must finish within `timeout`.
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, timeout })
    }

    fn classify(&self, err: reqwest::Error, url: &str) -> MediaError {
        if err.is_timeout() {
            MediaError::audio_timeout(format!(
                "no complete response from {} within {}s",
                url,
                self.timeout.as_secs()
            ))
        } else {
            MediaError::audio_fetch_failed(format!("request to {} failed: {}", url, err))
        }
    }
}

#[async_trait]
impl AudioSource for HttpAudioSource {
    async fn fetch(&self, track: &Track, dest: &Path) -> MediaResult<u64> {
        info!(track_id = %track.id, url = %track.url, "Downloading background track");

        let mut response = self
            .http
            .get(&track.url)
            .send()
            .await
            .map_err(|e| self.classify(e, &track.url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::audio_fetch_failed(format!(
                "{} returned {}",
                track.url, status
            )));
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
            MediaError::audio_fetch_failed(format!("cannot create {}: {}", dest.display(), e))
        })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.classify(e, &track.url))?
        {
            file.write_all(&chunk).await.map_err(|e| {
                MediaError::audio_fetch_failed(format!("cannot write {}: {}", dest.display(), e))
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| {
            MediaError::audio_fetch_failed(format!("cannot write {}: {}", dest.display(), e))
        })?;

        if written == 0 {
            return Err(MediaError::audio_fetch_failed(format!(
                "{} returned an empty body",
                track.url
            )));
        }

        debug!(track_id = %track.id, bytes = written, path = %dest.display(), "Track stored");
        Ok(written)
    }
}

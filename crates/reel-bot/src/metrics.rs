//! Prometheus metrics for the bot.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `port`.
pub fn init_metrics(port: u16) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .install()
}

/// Metric names as constants for consistency.
pub mod names {
    // Image generation
    pub const IMAGES_GENERATED_TOTAL: &str = "reelbot_images_generated_total";
    pub const IMAGE_FAILURES_TOTAL: &str = "reelbot_image_failures_total";

    // Rendering
    pub const VIDEOS_RENDERED_TOTAL: &str = "reelbot_videos_rendered_total";
    pub const RENDER_FAILURES_TOTAL: &str = "reelbot_render_failures_total";
    pub const RENDER_DURATION_SECONDS: &str = "reelbot_render_duration_seconds";

    // Sessions
    pub const SESSIONS_EXPIRED_TOTAL: &str = "reelbot_sessions_expired_total";
}

pub fn record_image_generated() {
    counter!(names::IMAGES_GENERATED_TOTAL).increment(1);
}

/// Record a failed generation by category (quota, auth, generic).
pub fn record_image_failure(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::IMAGE_FAILURES_TOTAL, &labels).increment(1);
}

/// Record a completed render and how long it took.
pub fn record_video_rendered(duration_secs: f64) {
    counter!(names::VIDEOS_RENDERED_TOTAL).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed render by pipeline stage.
pub fn record_render_failure(stage: &str) {
    let labels = [("stage", stage.to_string())];
    counter!(names::RENDER_FAILURES_TOTAL, &labels).increment(1);
}

pub fn record_sessions_expired(count: u64) {
    counter!(names::SESSIONS_EXPIRED_TOTAL).increment(count);
}

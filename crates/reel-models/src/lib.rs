//! Shared data models for reelbot.
//!
//! This crate provides Serde-serializable types for:
//! - User and render job identifiers
//! - The background track catalog
//! - Render settings (duration, frame rate, frame size, zoom)
//! - Encoding configuration

pub mod encoding;
pub mod ids;
pub mod render;
pub mod track;

// Re-export common types
pub use encoding::EncodingConfig;
pub use ids::{RenderJobId, UserId};
pub use render::{FrameSize, RenderSettings, RenderSettingsError};
pub use track::{CatalogError, Track, TrackCatalog, TrackId};

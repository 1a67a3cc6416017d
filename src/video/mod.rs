//! Video generation module.

mod images;
mod provider;
pub mod providers;
pub mod task;
mod types;

pub use images::{parse_image_urls, ImageUrls};
pub use provider::{VideoProvider, VideoProviderExt};
pub use task::TaskStatus;
pub use types::{
    DownloadedVideo, Orientation, Resolution, VideoGenerationRequest, VideoHandle, VideoMetadata,
    DEFAULT_DURATION_SECS, DEFAULT_MODEL, MAX_DURATION_SECS, MIN_DURATION_SECS,
};

//! Core types for video generation.

use crate::error::{Result, SoraError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model used when none is given.
pub const DEFAULT_MODEL: &str = "sora-2";

/// Clip length used when none is given, in seconds.
pub const DEFAULT_DURATION_SECS: u32 = 10;

/// Shortest clip the service accepts, in seconds.
pub const MIN_DURATION_SECS: u32 = 1;

/// Longest clip the service accepts, in seconds.
pub const MAX_DURATION_SECS: u32 = 60;

/// Output size tier, sent as the `size` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Small,
    Large,
}

impl Resolution {
    /// Returns the API identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Large => "large",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Returns the API identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to generate a video from reference images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    /// Reference image URLs, at least one.
    pub images: Vec<String>,
    /// The text prompt describing the desired video.
    pub prompt: String,
    /// Output size tier.
    pub resolution: Resolution,
    /// Desired clip duration in seconds (1-60).
    pub duration_secs: u32,
    /// Frame orientation.
    pub orientation: Orientation,
    /// Model identifier.
    pub model: String,
    /// Whether the service should watermark the clip.
    pub watermark: bool,
}

impl VideoGenerationRequest {
    /// Creates a new request with the given images and prompt.
    pub fn new(images: Vec<String>, prompt: impl Into<String>) -> Self {
        Self {
            images,
            prompt: prompt.into(),
            resolution: Resolution::default(),
            duration_secs: DEFAULT_DURATION_SECS,
            orientation: Orientation::default(),
            model: DEFAULT_MODEL.to_string(),
            watermark: false,
        }
    }

    /// Sets the output size tier.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the desired video duration in seconds.
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Sets the frame orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Enables or disables the watermark.
    pub fn with_watermark(mut self, watermark: bool) -> Self {
        self.watermark = watermark;
        self
    }

    /// Checks the request before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() {
            return Err(SoraError::InvalidRequest(
                "images is empty. Provide one or more image URLs.".into(),
            ));
        }
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&self.duration_secs) {
            return Err(SoraError::InvalidRequest(format!(
                "duration must be between {MIN_DURATION_SECS} and {MAX_DURATION_SECS} seconds, got {}",
                self.duration_secs
            )));
        }
        Ok(())
    }
}

/// Host-native handle to a file in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoHandle {
    /// File name inside the subfolder.
    pub filename: String,
    /// Subfolder under the output root.
    pub subfolder: String,
    /// Storage area, always `output`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl VideoHandle {
    /// Creates a handle into the output area.
    pub fn output(filename: impl Into<String>, subfolder: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            subfolder: subfolder.into(),
            kind: "output".to_string(),
        }
    }
}

/// Metadata about the video generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Wall-clock time from submission to finished download, in milliseconds.
    pub duration_ms: Option<u64>,
    /// Requested video duration in seconds.
    pub video_duration_secs: Option<u32>,
    /// Requested size tier.
    pub resolution: Option<Resolution>,
    /// Requested orientation.
    pub orientation: Option<Orientation>,
    /// Number of status queries issued.
    pub polls: u32,
}

/// A generated video that has been written to local storage.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedVideo {
    /// Task identifier assigned by the service.
    pub task_id: String,
    /// Remote URL the video was fetched from.
    pub url: String,
    /// Local file path.
    pub path: PathBuf,
    /// Host handle for the file.
    pub handle: VideoHandle,
    /// Size of the written file in bytes.
    pub bytes_written: u64,
    /// Generation metadata.
    pub metadata: VideoMetadata,
}

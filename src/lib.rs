#![warn(missing_docs)]
//! sora-fetch - create, poll and download Sora-compatible video jobs.
//!
//! This crate submits an image-to-video job to a relay API exposing
//! `/v1/video/create` and `/v1/video/query`, waits for it to finish and
//! streams the result into a local output directory. It also exposes the
//! job as a node for node-graph hosts.
//!
//! # Quick Start
//!
//! ```no_run
//! use sora_fetch::{OutputLayout, SoraProvider, VideoGenerationRequest, VideoProvider};
//!
//! #[tokio::main]
//! async fn main() -> sora_fetch::Result<()> {
//!     let provider = SoraProvider::builder().api_key("sk-...").build()?;
//!     let request = VideoGenerationRequest::new(
//!         vec!["https://example.com/cat.png".into()],
//!         "The cat starts surfing",
//!     )
//!     .with_duration(10);
//!     let video = provider.generate(&request, &OutputLayout::new("output")).await?;
//!     println!("saved {}", video.path.display());
//!     Ok(())
//! }
//! ```
//!
//! # Node usage
//!
//! ```no_run
//! use sora_fetch::node::{NodeInputs, SoraCreateFetchVideo};
//! use sora_fetch::OutputLayout;
//!
//! # async fn example() -> sora_fetch::Result<()> {
//! let inputs = NodeInputs::from_json(serde_json::json!({
//!     "images": "https://example.com/a.png\nhttps://example.com/b.png",
//!     "prompt": "slow dolly zoom",
//! }))?;
//! let node = SoraCreateFetchVideo::new(OutputLayout::resolve(None));
//! let output = node.run(&inputs).await?;
//! println!("{} <- {}", output.video_path, output.video_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `cli`: the `sora-fetch` command-line binary (default)

mod error;

pub mod node;
pub mod storage;
pub mod video;

// Re-export error types at crate root
pub use error::{parse_retry_after, sanitize_error_message, Result, SoraError};

pub use storage::OutputLayout;

pub use video::providers::{SoraProvider, SoraProviderBuilder};
pub use video::{
    parse_image_urls, DownloadedVideo, ImageUrls, Orientation, Resolution, TaskStatus,
    VideoGenerationRequest, VideoHandle, VideoMetadata, VideoProvider, VideoProviderExt,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SoraError};
    pub use crate::node::{NodeInputs, NodeOutput, SoraCreateFetchVideo};
    pub use crate::storage::OutputLayout;
    pub use crate::video::providers::SoraProvider;
    pub use crate::video::{
        DownloadedVideo, VideoGenerationRequest, VideoProvider, VideoProviderExt,
    };
}

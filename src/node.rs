//! Node-graph host integration.
//!
//! Exposes the create-poll-download job as a single graph node: a static
//! descriptor the host reads to render the node, an input map it fills in,
//! and a three-slot output (`video`, `video_path`, `video_url`).

use crate::error::{Result, SoraError};
use crate::storage::OutputLayout;
use crate::video::providers::{
    SoraProvider, DEFAULT_API_BASE, DEFAULT_ORIGIN, DEFAULT_REFERER, DEFAULT_USER_AGENT,
};
use crate::video::{
    ImageUrls, Orientation, Resolution, VideoGenerationRequest, VideoHandle, VideoProviderExt,
    DEFAULT_DURATION_SECS, DEFAULT_MODEL, MAX_DURATION_SECS, MIN_DURATION_SECS,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Class type the host registers the node under.
pub const NODE_CLASS: &str = "SoraCreateFetchVideo";

/// Name shown in the host's node menu.
pub const NODE_DISPLAY_NAME: &str = "Sora Create + Fetch Video (External API)";

/// Menu category.
pub const NODE_CATEGORY: &str = "Sora";

/// Entry point name.
pub const NODE_FUNCTION: &str = "run";

/// Output slot types.
pub const RETURN_TYPES: [&str; 3] = ["VIDEO", "STRING", "STRING"];

/// Output slot names.
pub const RETURN_NAMES: [&str; 3] = ["video", "video_path", "video_url"];

const DEFAULT_POLL_INTERVAL_SECS: i64 = 5;
const DEFAULT_MAX_WAIT_SECS: i64 = 600;
const POLL_INTERVAL_RANGE: RangeInclusive<i64> = 1..=60;
const MAX_WAIT_RANGE: RangeInclusive<i64> = 10..=3600;

/// Static description of the node for the host.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDescriptor {
    pub class_type: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub function: &'static str,
    pub input: Value,
    pub return_types: [&'static str; 3],
    pub return_names: [&'static str; 3],
    pub output_node: bool,
}

/// Input schema in the host's `{required, optional}` format.
pub fn input_types() -> Value {
    json!({
        "required": {
            "api_base": ["STRING", {"default": DEFAULT_API_BASE}],
            "api_key": ["STRING", {"default": "", "multiline": false}],
            "images": ["STRING", {"multiline": true, "default": ""}],
            "prompt": ["STRING", {"multiline": true, "default": ""}],
            "resolution": [["small", "large"], {"default": Resolution::default().as_str()}],
            "duration": ["INT", {
                "default": DEFAULT_DURATION_SECS,
                "min": MIN_DURATION_SECS,
                "max": MAX_DURATION_SECS
            }]
        },
        "optional": {
            "orientation": [["portrait", "landscape"], {"default": Orientation::default().as_str()}],
            "model": ["STRING", {"default": DEFAULT_MODEL}],
            "watermark": ["BOOLEAN", {"default": false}],
            "origin": ["STRING", {"default": DEFAULT_ORIGIN}],
            "referer": ["STRING", {"default": DEFAULT_REFERER}],
            "user_agent": ["STRING", {"default": DEFAULT_USER_AGENT}],
            "poll_interval": ["INT", {
                "default": DEFAULT_POLL_INTERVAL_SECS,
                "min": POLL_INTERVAL_RANGE.start(),
                "max": POLL_INTERVAL_RANGE.end()
            }],
            "max_wait": ["INT", {
                "default": DEFAULT_MAX_WAIT_SECS,
                "min": MAX_WAIT_RANGE.start(),
                "max": MAX_WAIT_RANGE.end()
            }]
        }
    })
}

/// Returns the node descriptor.
pub fn descriptor() -> NodeDescriptor {
    NodeDescriptor {
        class_type: NODE_CLASS,
        display_name: NODE_DISPLAY_NAME,
        category: NODE_CATEGORY,
        function: NODE_FUNCTION,
        input: input_types(),
        return_types: RETURN_TYPES,
        return_names: RETURN_NAMES,
        output_node: false,
    }
}

/// Class type to descriptor for every node this crate provides.
pub fn node_class_mappings() -> BTreeMap<&'static str, NodeDescriptor> {
    BTreeMap::from([(NODE_CLASS, descriptor())])
}

/// Class type to display name for every node this crate provides.
pub fn node_display_name_mappings() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([(NODE_CLASS, NODE_DISPLAY_NAME)])
}

/// Values the host passes to the node. Missing keys take the schema defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInputs {
    pub api_base: String,
    pub api_key: String,
    pub images: ImageUrls,
    pub prompt: String,
    pub resolution: Resolution,
    pub duration: i64,
    pub orientation: Orientation,
    pub model: String,
    pub watermark: bool,
    pub origin: String,
    pub referer: String,
    pub user_agent: String,
    pub poll_interval: i64,
    pub max_wait: i64,
}

impl Default for NodeInputs {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            images: ImageUrls::default(),
            prompt: String::new(),
            resolution: Resolution::default(),
            duration: i64::from(DEFAULT_DURATION_SECS),
            orientation: Orientation::default(),
            model: DEFAULT_MODEL.to_string(),
            watermark: false,
            origin: DEFAULT_ORIGIN.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            max_wait: DEFAULT_MAX_WAIT_SECS,
        }
    }
}

impl NodeInputs {
    /// Parses a host input map.
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Enforces the INT ranges declared in the schema.
    pub fn validate(&self) -> Result<()> {
        check_range(
            "duration",
            self.duration,
            &(i64::from(MIN_DURATION_SECS)..=i64::from(MAX_DURATION_SECS)),
        )?;
        check_range("poll_interval", self.poll_interval, &POLL_INTERVAL_RANGE)?;
        check_range("max_wait", self.max_wait, &MAX_WAIT_RANGE)?;
        Ok(())
    }

    /// Builds the generation request.
    pub fn to_request(&self) -> Result<VideoGenerationRequest> {
        self.validate()?;
        let request = VideoGenerationRequest::new(self.images.clone().into_urls(), &self.prompt)
            .with_resolution(self.resolution)
            .with_duration(u32::try_from(self.duration).unwrap_or(DEFAULT_DURATION_SECS))
            .with_orientation(self.orientation)
            .with_model(&self.model)
            .with_watermark(self.watermark);
        request.validate()?;
        Ok(request)
    }

    /// Builds a provider configured from these inputs.
    pub fn to_provider(&self) -> Result<SoraProvider> {
        self.validate()?;
        SoraProvider::builder()
            .api_base(&self.api_base)
            .api_key(&self.api_key)
            .origin(&self.origin)
            .referer(&self.referer)
            .user_agent(&self.user_agent)
            .poll_interval(Duration::from_secs(self.poll_interval.unsigned_abs()))
            .max_wait(Duration::from_secs(self.max_wait.unsigned_abs()))
            .build()
    }
}

fn check_range(name: &str, value: i64, range: &RangeInclusive<i64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SoraError::InvalidRequest(format!(
            "{name} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

/// The node's three output slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeOutput {
    pub video: VideoHandle,
    pub video_path: String,
    pub video_url: String,
}

/// The create-poll-download node.
#[derive(Debug, Clone)]
pub struct SoraCreateFetchVideo {
    layout: OutputLayout,
    retries: u32,
}

impl SoraCreateFetchVideo {
    /// Creates a node writing into the given layout.
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout, retries: 0 }
    }

    /// Re-runs the whole job up to `retries` times on transient errors.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Returns the output layout.
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Runs the job for one set of inputs.
    pub async fn run(&self, inputs: &NodeInputs) -> Result<NodeOutput> {
        let request = inputs.to_request()?;
        let provider = inputs.to_provider()?;

        let video = provider
            .generate_with_retries(&request, &self.layout, self.retries)
            .await?;
        tracing::info!(
            task_id = %video.task_id,
            path = %video.path.display(),
            bytes = video.bytes_written,
            "video ready"
        );

        Ok(NodeOutput {
            video: video.handle,
            video_path: video.path.display().to_string(),
            video_url: video.url,
        })
    }
}

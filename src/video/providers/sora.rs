//! Sora-compatible video generation provider.
//!
//! Talks to relay services that expose `/v1/video/create` and
//! `/v1/video/query`. A job is created from reference image URLs and a
//! prompt, polled until its status is terminal, and the finished clip is
//! streamed to local storage.

use crate::error::{error_from_status, Result, SoraError};
use crate::storage::{download_to_file, OutputLayout};
use crate::video::provider::VideoProvider;
use crate::video::task::{extract_task_id, extract_video_url, TaskStatus};
use crate::video::types::{DownloadedVideo, VideoGenerationRequest, VideoMetadata};
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER,
    USER_AGENT,
};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Environment variable consulted when no API key is given.
pub const API_KEY_ENV: &str = "SORA_API_KEY";

/// Default relay base URL.
pub const DEFAULT_API_BASE: &str = "https://manju.chat";

/// Default `Origin` header.
pub const DEFAULT_ORIGIN: &str = "https://web.apiplus.org";

/// Default `Referer` header.
pub const DEFAULT_REFERER: &str = "https://web.apiplus.org/";

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

const CREATE_PATH: &str = "/v1/video/create";
const QUERY_PATH: &str = "/v1/video/query";

/// Builder for SoraProvider.
#[derive(Debug, Clone)]
pub struct SoraProviderBuilder {
    api_base: String,
    api_key: Option<String>,
    origin: String,
    referer: String,
    user_agent: String,
    poll_interval: Duration,
    max_wait: Duration,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl Default for SoraProviderBuilder {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            origin: DEFAULT_ORIGIN.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(600), // 10 minutes for video
            request_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(300),
        }
    }
}

impl SoraProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service base URL. A trailing `/` is ignored.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the API key. Falls back to `SORA_API_KEY` when blank.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the `Origin` header. An empty value omits it.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Sets the `Referer` header. An empty value omits it.
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    /// Sets the `User-Agent` header. An empty value omits it.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the delay between status queries.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum time to wait for the task to finish.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Sets the timeout for the create call and each status query.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the timeout for the video download.
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Builds the provider, resolving the API key and headers.
    pub fn build(self) -> Result<SoraProvider> {
        let api_key = resolve_api_key(
            self.api_key.as_deref(),
            std::env::var(API_KEY_ENV).ok().as_deref(),
        );
        let headers = build_headers(
            api_key.as_deref(),
            &self.origin,
            &self.referer,
            &self.user_agent,
        )?;

        Ok(SoraProvider {
            client: reqwest::Client::new(),
            api_base: self.api_base.trim_end_matches('/').to_string(),
            has_api_key: api_key.is_some(),
            headers,
            poll_interval: self.poll_interval,
            max_wait: self.max_wait,
            request_timeout: self.request_timeout,
            download_timeout: self.download_timeout,
        })
    }
}

/// Picks the explicit key when it is non-blank, otherwise the env value.
fn resolve_api_key(explicit: Option<&str>, env: Option<&str>) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| env.map(str::trim).filter(|k| !k.is_empty()))
        .map(String::from)
}

fn build_headers(
    api_key: Option<&str>,
    origin: &str,
    referer: &str,
    user_agent: &str,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(key) = api_key {
        insert_header(&mut headers, AUTHORIZATION, &format!("Bearer {key}"))?;
    }
    for (name, value) in [(ORIGIN, origin), (REFERER, referer), (USER_AGENT, user_agent)] {
        if !value.is_empty() {
            insert_header(&mut headers, name, value)?;
        }
    }
    Ok(headers)
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let parsed = HeaderValue::from_str(value)
        .map_err(|_| SoraError::InvalidRequest(format!("invalid value for header {name}")))?;
    headers.insert(name, parsed);
    Ok(())
}

/// Sora-compatible video generation provider.
pub struct SoraProvider {
    client: reqwest::Client,
    api_base: String,
    has_api_key: bool,
    headers: HeaderMap,
    poll_interval: Duration,
    max_wait: Duration,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl SoraProvider {
    /// Creates a new `SoraProviderBuilder`.
    pub fn builder() -> SoraProviderBuilder {
        SoraProviderBuilder::new()
    }

    /// Returns the normalized base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn create_url(&self) -> String {
        format!("{}{}", self.api_base, CREATE_PATH)
    }

    fn query_url(&self) -> String {
        format!("{}{}", self.api_base, QUERY_PATH)
    }

    /// Submits a job. Returns the task id.
    pub async fn create(&self, request: &VideoGenerationRequest) -> Result<String> {
        let body = CreateRequest::from_request(request);

        let response = self
            .client
            .post(self.create_url())
            .headers(self.headers.clone())
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await?;

        let data = read_json(response).await?;
        extract_task_id(&data).ok_or_else(|| SoraError::MissingTaskId(data.to_string()))
    }

    /// Queries the task once and returns the raw response body.
    pub async fn query(&self, task_id: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.query_url())
            .query(&[("id", task_id)])
            .headers(self.headers.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        read_json(response).await
    }

    /// Polls until the task finishes. Returns the final body and the number
    /// of queries issued.
    pub async fn poll_until_ready(&self, task_id: &str) -> Result<(Value, u32)> {
        let start = Instant::now();
        let mut polls = 0u32;

        loop {
            let last = self.query(task_id).await?;
            polls += 1;

            match TaskStatus::from_response(&last) {
                TaskStatus::Completed => return Ok((last, polls)),
                TaskStatus::Failed(_) => return Err(SoraError::TaskFailed(last.to_string())),
                TaskStatus::Pending(status) => {
                    tracing::debug!(
                        task_id = %task_id,
                        status = status.as_deref().unwrap_or("unknown"),
                        polls,
                        elapsed_secs = start.elapsed().as_secs(),
                        "polling video task"
                    );
                }
            }

            if start.elapsed() > self.max_wait {
                return Err(SoraError::Timeout {
                    waited: self.max_wait,
                    last: last.to_string(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Streams the finished video at `url` into `layout`'s file for `task_id`.
    async fn download(&self, url: &str, task_id: &str, layout: &OutputLayout) -> Result<u64> {
        let dest = layout.path_for(task_id);
        let written = download_to_file(&self.client, url, &dest, self.download_timeout).await?;
        tracing::debug!(path = %dest.display(), bytes = written, "downloaded video");
        Ok(written)
    }
}

/// Turns a response into JSON, mapping non-success statuses to errors.
async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let headers = response.headers().clone();
        let text = response.text().await.unwrap_or_default();
        return Err(error_from_status(status.as_u16(), &text, &headers));
    }
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl VideoProvider for SoraProvider {
    async fn generate(
        &self,
        request: &VideoGenerationRequest,
        layout: &OutputLayout,
    ) -> Result<DownloadedVideo> {
        request.validate()?;
        let start = Instant::now();

        let task_id = self.create(request).await?;
        tracing::debug!(task_id = %task_id, "submitted video generation request");

        let (last, polls) = self.poll_until_ready(&task_id).await?;
        tracing::debug!(task_id = %task_id, polls, "video generation complete");

        let url =
            extract_video_url(&last).ok_or_else(|| SoraError::MissingVideoUrl(last.to_string()))?;

        let bytes_written = self.download(&url, &task_id, layout).await?;

        Ok(DownloadedVideo {
            path: layout.path_for(&task_id),
            handle: layout.handle_for(&task_id),
            task_id,
            url,
            bytes_written,
            metadata: VideoMetadata {
                model: Some(request.model.clone()),
                duration_ms: Some(start.elapsed().as_millis() as u64),
                video_duration_secs: Some(request.duration_secs),
                resolution: Some(request.resolution),
                orientation: Some(request.orientation),
                polls,
            },
        })
    }

    fn name(&self) -> &str {
        "Sora (relay API)"
    }

    async fn health_check(&self) -> Result<()> {
        if self.has_api_key {
            Ok(())
        } else {
            Err(SoraError::Auth(format!(
                "{API_KEY_ENV} not set and no API key provided"
            )))
        }
    }
}

// Request types

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    images: &'a [String],
    model: &'a str,
    orientation: &'a str,
    prompt: &'a str,
    size: &'a str,
    duration: u32,
    watermark: bool,
}

impl<'a> CreateRequest<'a> {
    fn from_request(req: &'a VideoGenerationRequest) -> Self {
        Self {
            images: &req.images,
            model: &req.model,
            orientation: req.orientation.as_str(),
            prompt: &req.prompt,
            size: req.resolution.as_str(),
            duration: req.duration_secs,
            watermark: req.watermark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{Orientation, Resolution};
    use serde_json::json;

    #[test]
    fn test_resolve_api_key_prefers_explicit() {
        assert_eq!(
            resolve_api_key(Some(" sk-explicit "), Some("sk-env")).as_deref(),
            Some("sk-explicit")
        );
    }

    #[test]
    fn test_resolve_api_key_blank_falls_back_to_env() {
        assert_eq!(resolve_api_key(Some("   "), Some("sk-env")).as_deref(), Some("sk-env"));
        assert_eq!(resolve_api_key(None, Some("sk-env")).as_deref(), Some("sk-env"));
        assert_eq!(resolve_api_key(None, Some("")), None);
        assert_eq!(resolve_api_key(None, None), None);
    }

    #[test]
    fn test_headers_with_key() {
        let headers = build_headers(Some("sk-1"), "https://o.test", "https://r.test/", "ua/1").unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-1");
        assert_eq!(headers[ORIGIN], "https://o.test");
        assert_eq!(headers[REFERER], "https://r.test/");
        assert_eq!(headers[USER_AGENT], "ua/1");
    }

    #[test]
    fn test_headers_omit_empty_values() {
        let headers = build_headers(None, "", "", "").unwrap();
        assert_eq!(headers.len(), 2);
        assert!(headers.get(AUTHORIZATION).is_none());
        assert!(headers.get(ORIGIN).is_none());
        assert!(headers.get(REFERER).is_none());
        assert!(headers.get(USER_AGENT).is_none());
    }

    #[test]
    fn test_headers_reject_invalid_value() {
        let err = build_headers(None, "bad\norigin", "", "").unwrap_err();
        assert!(matches!(err, SoraError::InvalidRequest(_)));
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let provider = SoraProviderBuilder::new()
            .api_base("https://relay.test///")
            .api_key("sk-test")
            .build()
            .unwrap();
        assert_eq!(provider.api_base(), "https://relay.test");
        assert_eq!(provider.create_url(), "https://relay.test/v1/video/create");
        assert_eq!(provider.query_url(), "https://relay.test/v1/video/query");
    }

    #[test]
    fn test_builder_custom_timeouts() {
        let provider = SoraProviderBuilder::new()
            .api_key("sk-test")
            .poll_interval(Duration::from_secs(10))
            .max_wait(Duration::from_secs(900))
            .build()
            .unwrap();
        assert_eq!(provider.poll_interval, Duration::from_secs(10));
        assert_eq!(provider.max_wait, Duration::from_secs(900));
        assert_eq!(provider.request_timeout, Duration::from_secs(60));
        assert_eq!(provider.download_timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_health_check_with_key() {
        let provider = SoraProviderBuilder::new().api_key("sk-test").build().unwrap();
        assert!(provider.health_check().await.is_ok());
    }

    #[test]
    fn test_create_body_shape() {
        let req = VideoGenerationRequest::new(
            vec!["https://a.test/1.png".into(), "https://a.test/2.png".into()],
            "A flying bird",
        )
        .with_resolution(Resolution::Large)
        .with_orientation(Orientation::Landscape)
        .with_duration(15)
        .with_watermark(true);

        let body = serde_json::to_value(CreateRequest::from_request(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "images": ["https://a.test/1.png", "https://a.test/2.png"],
                "model": "sora-2",
                "orientation": "landscape",
                "prompt": "A flying bird",
                "size": "large",
                "duration": 15,
                "watermark": true
            })
        );
    }
}

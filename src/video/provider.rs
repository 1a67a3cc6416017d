//! Video provider trait and utilities.

use crate::error::Result;
use crate::storage::OutputLayout;
use crate::video::types::{DownloadedVideo, VideoGenerationRequest};
use async_trait::async_trait;

/// Trait for video generation providers.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Runs a job to completion and stores the video under `layout`.
    async fn generate(
        &self,
        request: &VideoGenerationRequest,
        layout: &OutputLayout,
    ) -> Result<DownloadedVideo>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Checks that the provider has credentials configured.
    async fn health_check(&self) -> Result<()>;
}

/// Extension trait for providers with retry logic.
#[async_trait]
pub trait VideoProviderExt: VideoProvider {
    /// Generates with automatic retries on transient failures.
    ///
    /// Every attempt submits a new job. That includes network errors
    /// raised while polling or downloading, after the service has already
    /// accepted (and may bill) the previous job.
    async fn generate_with_retries(
        &self,
        request: &VideoGenerationRequest,
        layout: &OutputLayout,
        max_retries: u32,
    ) -> Result<DownloadedVideo> {
        let mut attempt = 0;
        loop {
            match self.generate(request, layout).await {
                Ok(video) => return Ok(video),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let delay = e.retry_after().unwrap_or(std::time::Duration::from_secs(1));
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis(),
                        "retrying after transient error: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<T: VideoProvider + ?Sized> VideoProviderExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SoraError;
    use crate::video::{VideoHandle, VideoMetadata};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Flaky {
        calls: AtomicU32,
        fail_first: u32,
        error: fn() -> SoraError,
    }

    #[async_trait]
    impl VideoProvider for Flaky {
        async fn generate(
            &self,
            _request: &VideoGenerationRequest,
            layout: &OutputLayout,
        ) -> Result<DownloadedVideo> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err((self.error)());
            }
            Ok(DownloadedVideo {
                task_id: "t".into(),
                url: "https://cdn.test/t.mp4".into(),
                path: layout.path_for("t"),
                handle: VideoHandle::output("sora_t.mp4", "sora"),
                bytes_written: 3,
                metadata: VideoMetadata::default(),
            })
        }

        fn name(&self) -> &str {
            "flaky"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn rate_limited() -> SoraError {
        SoraError::RateLimited {
            retry_after: Some(Duration::from_millis(1)),
        }
    }

    fn failed() -> SoraError {
        SoraError::TaskFailed("{}".into())
    }

    fn request() -> VideoGenerationRequest {
        VideoGenerationRequest::new(vec!["https://a.test/1.png".into()], "p")
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let provider = Flaky {
            calls: AtomicU32::new(0),
            fail_first: 2,
            error: rate_limited,
        };
        let layout = OutputLayout::new("/tmp/unused");
        let video = provider
            .generate_with_retries(&request(), &layout, 3)
            .await
            .unwrap();
        assert_eq!(video.task_id, "t");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let provider = Flaky {
            calls: AtomicU32::new(0),
            fail_first: 10,
            error: rate_limited,
        };
        let layout = OutputLayout::new("/tmp/unused");
        let err = provider
            .generate_with_retries(&request(), &layout, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, SoraError::RateLimited { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_terminal_errors() {
        let provider = Flaky {
            calls: AtomicU32::new(0),
            fail_first: 1,
            error: failed,
        };
        let layout = OutputLayout::new("/tmp/unused");
        let err = provider
            .generate_with_retries(&request(), &layout, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SoraError::TaskFailed(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}

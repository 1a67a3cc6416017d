//! Local output layout and streamed downloads.

use crate::error::{error_from_status, Result};
use crate::video::VideoHandle;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Environment variable that overrides the output root.
pub const OUTPUT_DIR_ENV: &str = "SORA_OUTPUT_DIR";

/// Output root used when nothing else is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Subfolder every video is written to.
pub const SUBFOLDER: &str = "sora";

/// Where downloaded videos land: `<root>/sora/sora_<task>.mp4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    subfolder: String,
}

impl OutputLayout {
    /// Creates a layout rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subfolder: SUBFOLDER.to_string(),
        }
    }

    /// Resolves the root from an explicit path, then `SORA_OUTPUT_DIR`,
    /// then `./output`.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let root = explicit
            .or_else(|| {
                std::env::var_os(OUTPUT_DIR_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        Self::new(root)
    }

    /// Returns the output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the subfolder name.
    pub fn subfolder(&self) -> &str {
        &self.subfolder
    }

    /// Returns `<root>/<subfolder>`.
    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.subfolder)
    }

    /// Creates the output directory if it does not exist.
    pub async fn ensure_dir(&self) -> Result<PathBuf> {
        let dir = self.dir();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Full path of the video for a task.
    pub fn path_for(&self, task_id: &str) -> PathBuf {
        self.dir().join(file_name_for(task_id))
    }

    /// Host handle for the video of a task.
    pub fn handle_for(&self, task_id: &str) -> VideoHandle {
        VideoHandle::output(file_name_for(task_id), self.subfolder.clone())
    }
}

/// File name for a task's video.
///
/// `:` and path separators in the id are replaced by `_`.
pub fn file_name_for(task_id: &str) -> String {
    let safe: String = task_id
        .chars()
        .map(|c| match c {
            ':' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    format!("sora_{safe}.mp4")
}

/// Streams the body at `url` into `dest`, creating its parent directory.
///
/// Bytes go to `<dest>.part` first and the file is renamed once the body
/// is complete, so `dest` never holds a truncated video. Returns the
/// number of bytes written.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(url).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        let headers = response.headers().clone();
        let text = response.text().await.unwrap_or_default();
        return Err(error_from_status(status.as_u16(), &text, &headers));
    }

    let partial = partial_path(dest);
    let result: Result<u64> = match write_stream(response, &partial).await {
        Ok(written) => tokio::fs::rename(&partial, dest)
            .await
            .map(|()| written)
            .map_err(Into::into),
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}

async fn write_stream(response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_replaces_colons() {
        assert_eq!(file_name_for("sora-2:task_01"), "sora_sora-2_task_01.mp4");
        assert_eq!(file_name_for("abc"), "sora_abc.mp4");
    }

    #[test]
    fn test_file_name_stays_in_subfolder() {
        assert_eq!(file_name_for("../../etc/x"), "sora_.._.._etc_x.mp4");
        assert_eq!(file_name_for(r"a\b"), "sora_a_b.mp4");
    }

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout::new("/data/out");
        assert_eq!(layout.dir(), PathBuf::from("/data/out/sora"));
        assert_eq!(
            layout.path_for("t:1"),
            PathBuf::from("/data/out/sora/sora_t_1.mp4")
        );
        assert_eq!(layout.handle_for("t:1"), VideoHandle::output("sora_t_1.mp4", "sora"));
    }

    #[test]
    fn test_resolve_prefers_explicit_path() {
        let layout = OutputLayout::resolve(Some(PathBuf::from("/explicit")));
        assert_eq!(layout.root(), Path::new("/explicit"));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/o/sora/sora_a.mp4")),
            PathBuf::from("/o/sora/sora_a.mp4.part")
        );
    }

    #[tokio::test]
    async fn test_failed_rename_removes_partial_file() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("sora").join("sora_t.mp4");
        // a non-empty directory in place of the file makes the rename fail
        std::fs::create_dir_all(dest.join("occupied")).unwrap();

        let err = download_to_file(
            &reqwest::Client::new(),
            &format!("{}/v.mp4", server.uri()),
            &dest,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, crate::error::SoraError::Io(_)));
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_subfolder() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(tmp.path());
        let dir = layout.ensure_dir().await.unwrap();
        assert!(dir.is_dir());
        assert!(dir.ends_with("sora"));
    }
}

//! Interpretation of create and query response bodies.
//!
//! The service returns loosely shaped JSON. Status and result fields may
//! sit at the top level or under `detail`, so everything here works on
//! [`serde_json::Value`] rather than fixed structs.

use serde_json::Value;

/// Status values that mean the video is ready.
pub const DONE_STATUSES: [&str; 4] = ["completed", "succeeded", "success", "done"];

/// Status values that mean the task will never finish.
pub const FAILED_STATUSES: [&str; 4] = ["failed", "error", "canceled", "cancelled"];

/// Classified state of a generation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed(String),
    /// Still running, or a status this client does not recognise.
    Pending(Option<String>),
}

impl TaskStatus {
    /// Classifies a query response body.
    pub fn from_response(body: &Value) -> Self {
        match raw_status(body) {
            Some(status) if matches_any(&status, &DONE_STATUSES) => Self::Completed,
            Some(status) if matches_any(&status, &FAILED_STATUSES) => Self::Failed(status),
            other => Self::Pending(other),
        }
    }

    /// Returns true for completed and failed tasks.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

fn matches_any(status: &str, set: &[&str]) -> bool {
    set.iter().any(|s| s.eq_ignore_ascii_case(status))
}

/// A JSON value that carries information (the inverse of JSON falsiness).
fn present(value: &Value) -> Option<&Value> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Status text from `status`, falling back to `detail.status`.
fn raw_status(body: &Value) -> Option<String> {
    body.get("status")
        .and_then(present)
        .or_else(|| body.get("detail").and_then(|d| d.get("status")).and_then(present))
        .map(render)
}

/// Reads the task identifier from a create response.
///
/// Accepts a non-empty string or a number.
pub fn extract_task_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finds the downloadable video URL in a finished query response.
///
/// Lookup order: `video_url`, `detail.url`, `detail.downloadable_url`.
pub fn extract_video_url(body: &Value) -> Option<String> {
    let non_empty_str = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(String::from);

    if let Some(url) = body.get("video_url").and_then(non_empty_str) {
        return Some(url);
    }
    let detail = body.get("detail")?;
    detail
        .get("url")
        .and_then(non_empty_str)
        .or_else(|| detail.get("downloadable_url").and_then(non_empty_str))
}

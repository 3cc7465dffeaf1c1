use crate::models::{ExecutionMode, Language};
use std::path::PathBuf;
use std::time::Duration;

/// Longest stderr excerpt carried inside a user-visible error.
pub const STDERR_EXCERPT_LIMIT: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("No extraction engine available for {language}: {reason}")]
    Unavailable { language: Language, reason: String },

    #[error("Extraction tool for {language} timed out after {}s ({mode} mode)", .timeout.as_secs())]
    Timeout {
        language: Language,
        mode: ExecutionMode,
        timeout: Duration,
    },

    #[error("Extraction tool for {language} failed ({mode} mode, exit code {}): {stderr}", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    ProcessFailure {
        language: Language,
        mode: ExecutionMode,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Extraction tool for {language} produced more than {limit} bytes of output ({mode} mode)")]
    OutputTooLarge {
        language: Language,
        mode: ExecutionMode,
        limit: usize,
    },

    #[error("Container image '{image}' is not from a trusted registry (trusted: {trusted})")]
    UntrustedImage { image: String, trusted: String },

    #[error("Malformed output from {language} extraction tool ({mode} mode): {detail}")]
    MalformedOutput {
        language: Language,
        mode: ExecutionMode,
        detail: String,
    },

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Invalid target path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SurfaceError {
    /// Terminal errors are not worth retrying without an environment change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SurfaceError::Unavailable { .. }
                | SurfaceError::UntrustedImage { .. }
                | SurfaceError::UnsupportedLanguage(_)
        )
    }
}

/// Keep the tail of stderr; the last lines usually hold the actual failure.
pub fn stderr_excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_EXCERPT_LIMIT {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - STDERR_EXCERPT_LIMIT;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}

pub type Result<T> = std::result::Result<T, SurfaceError>;

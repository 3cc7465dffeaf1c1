use thiserror::Error;

/// Failure to interpret a collaborator payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected payload shape: {0}")]
    Schema(String),
    #[error("empty payload")]
    Empty,
}

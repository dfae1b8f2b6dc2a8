use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClaimError>;

#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Claim lock error: {0}")]
    Lock(String),

    #[error("No claim recorded for message {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

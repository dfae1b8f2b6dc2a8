use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolverError>;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid code: {0}")]
    InvalidCode(String),

    #[error("Invalid cache snapshot: {0}")]
    InvalidCache(String),

    #[error("{0}")]
    Other(String),
}

impl From<oumodules_protocol::InvalidCode> for ResolverError {
    fn from(err: oumodules_protocol::InvalidCode) -> Self {
        Self::InvalidCode(err.0)
    }
}

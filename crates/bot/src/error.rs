use oumodules_claims::ClaimError;
use oumodules_resolver::ResolverError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Claim error: {0}")]
    Claim(#[from] ClaimError),

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Reply failed: {0}")]
    Reply(String),

    #[error("Discord API error {status}: {message}")]
    Discord { status: u16, message: String },

    #[error("Invalid interaction: {0}")]
    InvalidInteraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

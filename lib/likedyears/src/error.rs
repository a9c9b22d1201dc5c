use thiserror::Error;

#[derive(Error, Debug)]
pub enum LikedYearsError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Access token rejected: {0}")]
    Unauthorized(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Spotify client is not configured (missing access token)")]
    NotConfigured,

    #[error("Missing required {0} env var")]
    MissingEnv(&'static str),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Aggregation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, LikedYearsError>;

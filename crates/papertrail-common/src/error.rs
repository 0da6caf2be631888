use thiserror::Error;

#[derive(Debug, Error)]
pub enum PapertrailError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network capability capped: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PapertrailError>;

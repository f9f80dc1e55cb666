//! Error types for the reconnaissance engine

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum ReconError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Browser error: {0}")]
    BrowserError(String),

    #[error("Navigation to {0} failed")]
    NavigationError(String),

    #[error("Navigation to {url} timed out after {secs} seconds")]
    FetchTimeout { url: String, secs: u64 },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, ReconError>;

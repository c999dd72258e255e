use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Sink rejected message for {destination}: {message}")]
    Sink {
        destination: String,
        message: String,
    },

    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    /// The run published items but could not write the ledger snapshot.
    /// The in-memory marks survive for the next persist attempt.
    #[error("Ledger persist failed after publishing {published} items: {source}")]
    Persist {
        published: usize,
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl RelayError {
    pub fn sink(destination: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Sink {
            destination: destination.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

use thiserror::Error;

use crate::config::ConfigError;

/// Outcome of a failed credential check.
///
/// Cloneable because a single memoized outcome is handed to every caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unexpected status code during authentication: {0}")]
    UnexpectedStatus(u16),

    #[error("Could not reach the feed service: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum FeedSweepError {
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Failed to fetch unread items: {0}")]
    Fetch(String),

    #[error("Failed to mark item {id} as read: {reason}")]
    MarkRead { id: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FeedSweepError {
    /// Errors that make any work impossible and should fail the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FeedSweepError::Auth(_) | FeedSweepError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, FeedSweepError>;

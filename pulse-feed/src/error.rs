//! Fetch and configuration errors.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// A page fetch that did not produce usable results.
///
/// Every variant is a fetch failure from the view's point of view: loading
/// stops, the message is shown inline and already loaded rows stay visible.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The request never produced a response.
    #[error("request for page {page} failed: {message}")]
    Transport {
        /// Page that was requested.
        page: u32,
        /// Transport level description.
        message: String,
    },
    /// The server answered with a non-success HTTP status.
    #[error("server returned status {status} for page {page}")]
    Status {
        /// Page that was requested.
        page: u32,
        /// HTTP status code.
        status: u16,
    },
    /// The server answered `success: false`.
    #[error("server rejected page {page}: {message}")]
    Rejected {
        /// Page that was requested.
        page: u32,
        /// Message reported by the server, if any.
        message: String,
    },
    /// The body lacked required fields or was not valid JSON.
    #[error("malformed response for page {page}: {reason}")]
    Malformed {
        /// Page that was requested.
        page: u32,
        /// What was wrong with the body.
        reason: String,
    },
    /// No response arrived within the configured timeout.
    #[error("request for page {page} timed out after {}ms", .elapsed.as_millis())]
    Timeout {
        /// Page that was requested.
        page: u32,
        /// Time waited before giving up.
        elapsed: Duration,
    },
}

impl FeedError {
    /// The page the failed request was for.
    pub fn page(&self) -> u32 {
        match self {
            Self::Transport { page, .. }
            | Self::Status { page, .. }
            | Self::Rejected { page, .. }
            | Self::Malformed { page, .. }
            | Self::Timeout { page, .. } => *page,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Rejected { .. } | Self::Malformed { .. } => false,
        }
    }

    /// Short message suitable for an inline error banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } if !message.is_empty() => message.clone(),
            Self::Timeout { .. } => "The server took too long to respond.".to_owned(),
            _ if self.is_transient() => {
                "Could not load more results. Check your connection.".to_owned()
            }
            _ => "Could not load more results.".to_owned(),
        }
    }
}

/// Failure to load or validate a [`FeedConfig`](crate::config::FeedConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config `{}`: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML did not match the config schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value was out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

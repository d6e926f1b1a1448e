use pulse_feed::ListingView;
use thiserror::Error;

/// Failures of the async feed plumbing itself (not of page fetches).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ShardError {
    /// The configured base URL cannot address a listing endpoint.
    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl {
        /// URL as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The driver of a view stopped and no longer accepts commands.
    #[error("feed driver for `{view}` has shut down")]
    DriverClosed {
        /// View whose driver stopped.
        view: ListingView,
    },
}

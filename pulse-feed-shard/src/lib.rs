//! Async plumbing for `pulse-feed`.
//!
//! - [`PageSource`] abstracts the listing API; [`HttpPageSource`] talks to
//!   the real endpoints and [`MemoryPageSource`] serves fixed data.
//! - [`FeedDriver`] runs one view's [`FeedController`](pulse_feed::FeedController)
//!   behind a command queue and publishes snapshots on a watch channel.
//! - [`FeedRegistry`] keeps one driver per view.
#![deny(clippy::unwrap_used)]

pub mod driver;
pub mod error;
pub mod http;
pub mod registry;
pub mod source;
pub mod task_handles;
mod tokio_runtime;

pub use driver::{FeedCommand, FeedDriver, FeedHandle};
pub use error::ShardError;
pub use http::HttpPageSource;
pub use registry::FeedRegistry;
pub use source::{MemoryPageSource, PageSource};
pub use task_handles::TaskHandles;

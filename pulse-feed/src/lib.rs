//! Infinite-scroll pagination for pulse listing views.
//!
//! # Usage
//!
//! Each listing view owns one [`FeedController`]. The controller decides
//! which page to request and merges responses into a [`DisplayList`] of
//! grouped (3-up) and single rows. Performing the requests is left to the
//! caller, see `pulse-feed-shard` for the async driver.
//!
//! ```
//! use std::time::Instant;
//!
//! use pulse_feed::{
//!     FeedController, FilterKey, PageResponse, ResultItem, VisibilityEvent,
//! };
//!
//! let mut feed = FeedController::default();
//! let first = feed
//!     .set_filter(FilterKey::new().with("sectorId", "banking"))
//!     .expect("a new filter requests page 1");
//!
//! let page = vec![
//!     ResultItem::new("t1", 1, "Type-One"),
//!     ResultItem::new("t2", 2, "Type-One"),
//! ];
//! feed.apply(&first, Ok(PageResponse::new(page, true)));
//!
//! // The renderer reports the last row entering the viewport.
//! let last = feed.display().last_key().cloned().expect("one row");
//! let next = feed.on_visibility(&VisibilityEvent::visible(last), Instant::now());
//! assert_eq!(next.map(|request| request.page), Some(2));
//! ```
#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod item;
pub mod merge;
pub mod page;
pub mod sentinel;
pub mod slug;
pub mod view;

pub use config::{FailedPagePolicy, FeedConfig, RetryPolicy};
pub use controller::{ApplyOutcome, FeedController, FeedPhase, FeedSnapshot};
pub use cursor::{CursorTracker, FIRST_PAGE};
pub use error::{ConfigError, FeedError};
pub use filter::FilterKey;
pub use grouping::{DisplayEntry, DisplayGroup, DisplayList, DisplaySingle, GroupingPolicy};
pub use item::{ItemId, ResultItem};
pub use merge::merge_items;
pub use page::{PageEnvelope, PageRequest, PageResponse, RequestId};
pub use sentinel::{Sentinel, SentinelChange, VisibilityEvent};
pub use view::{ListingView, UnknownView};

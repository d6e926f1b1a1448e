//! One driver per listing view.
//!
//! Views never share pagination state: each gets its own [`FeedDriver`],
//! opened on first use and reused afterwards.

use dashmap::{DashMap, mapref::entry::Entry};
use pulse_feed::{FeedConfig, ListingView};
use tracing::debug;

use crate::{
    driver::{FeedDriver, FeedHandle},
    source::PageSource,
};

/// Running feeds keyed by view.
#[derive(Default)]
pub struct FeedRegistry {
    config: FeedConfig,
    feeds: DashMap<ListingView, FeedHandle>,
}

impl FeedRegistry {
    /// A registry whose drivers all use `config`.
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            feeds: DashMap::new(),
        }
    }

    /// Handle of the running driver for `view`, if any.
    pub fn get(&self, view: ListingView) -> Option<FeedHandle> {
        self.feeds
            .get(&view)
            .map(|handle| handle.clone())
            .filter(|handle| !handle.is_closed())
    }

    /// Returns the driver for `view`, spawning one over `make_source(view)`
    /// when none is running.
    pub fn open<S, F>(&self, view: ListingView, make_source: F) -> FeedHandle
    where
        S: PageSource,
        F: FnOnce(ListingView) -> S,
    {
        match self.feeds.entry(view) {
            Entry::Occupied(entry) if !entry.get().is_closed() => entry.get().clone(),
            entry => {
                debug!(%view, "opening feed");
                let (driver, handle) =
                    FeedDriver::new(view, self.config.clone(), make_source(view));
                driver.spawn();
                entry.insert(handle.clone());
                handle
            }
        }
    }

    /// Views with a running driver.
    pub fn views(&self) -> Vec<ListingView> {
        self.feeds
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .map(|entry| *entry.key())
            .collect()
    }

    /// Stops the driver of `view`. Returns whether one was running.
    pub fn close(&self, view: ListingView) -> bool {
        self.feeds
            .remove(&view)
            .is_some_and(|(_, handle)| handle.shutdown().is_ok())
    }

    /// Stops every driver.
    pub fn close_all(&self) {
        self.feeds.retain(|_, handle| {
            let _ = handle.shutdown();
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pulse_feed::{FilterKey, ResultItem};

    use super::*;
    use crate::source::MemoryPageSource;

    fn source(id: &str) -> Arc<MemoryPageSource> {
        Arc::new(MemoryPageSource::new(vec![ResultItem::new(id, 1, "Type-Two")], 5))
    }

    #[tokio::test]
    async fn views_keep_separate_state() {
        let registry = FeedRegistry::new(FeedConfig::default().debounce_ms(0));
        let today = registry.open(ListingView::PulseToday, |_| source("today"));
        let trends = registry.open(ListingView::TrendAnalyzer, |_| source("trend"));

        today.set_filter(FilterKey::new()).expect("driver running");
        trends.set_filter(FilterKey::new()).expect("driver running");

        let today = today
            .wait_for(|snapshot| !snapshot.display.is_empty())
            .await
            .expect("today loaded");
        let trends = trends
            .wait_for(|snapshot| !snapshot.display.is_empty())
            .await
            .expect("trends loaded");
        assert_eq!(today.display.last_key().map(|id| id.as_str()), Some("today"));
        assert_eq!(trends.display.last_key().map(|id| id.as_str()), Some("trend"));

        let mut views = registry.views();
        views.sort_by_key(|view| view.name());
        assert_eq!(views, [ListingView::PulseToday, ListingView::TrendAnalyzer]);
    }

    #[tokio::test]
    async fn reopening_reuses_the_running_driver() {
        let registry = FeedRegistry::default();
        let shared = source("a");
        registry.open(ListingView::InfluencerComment, |_| shared.clone());

        let mut opened_again = false;
        registry.open(ListingView::InfluencerComment, |_| {
            opened_again = true;
            shared.clone()
        });
        assert!(!opened_again);

        assert!(registry.close(ListingView::InfluencerComment));
        assert!(registry.get(ListingView::InfluencerComment).is_none());
        assert!(!registry.close(ListingView::InfluencerComment));
    }
}

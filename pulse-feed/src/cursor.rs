//! Page cursor bookkeeping for one listing view.

use std::collections::BTreeSet;

use tracing::debug;

use crate::filter::FilterKey;

/// First page of every listing.
pub const FIRST_PAGE: u32 = 1;

/// Tracks the page cursor and which pages were already requested for the
/// current filter key.
///
/// The tracker performs no I/O. Pages are marked as fetched optimistically
/// when a request starts, so overlapping triggers for the same page are
/// suppressed even before the first response arrives.
#[derive(Clone, Debug)]
pub struct CursorTracker {
    page: u32,
    fetched: BTreeSet<u32>,
    filter: Option<FilterKey>,
}

impl Default for CursorTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorTracker {
    /// Creates a tracker with no filter recorded yet.
    pub fn new() -> Self {
        Self {
            page: FIRST_PAGE,
            fetched: BTreeSet::new(),
            filter: None,
        }
    }

    /// The next page to request.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// The filter key the fetched pages belong to.
    pub fn filter(&self) -> Option<&FilterKey> {
        self.filter.as_ref()
    }

    /// Returns whether `page` was already requested under the current key.
    pub fn is_fetched(&self, page: u32) -> bool {
        self.fetched.contains(&page)
    }

    /// Returns `false` only when `page` was already requested and `filter` is
    /// the key those requests were made under.
    pub fn should_fetch(&self, page: u32, filter: &FilterKey) -> bool {
        !(self.fetched.contains(&page) && self.filter.as_ref() == Some(filter))
    }

    /// Records a filter change. Returns `true` when the key differs from the
    /// stored one and the tracker was reset to page 1.
    pub fn on_filter_change(&mut self, filter: &FilterKey) -> bool {
        if self.filter.as_ref() == Some(filter) {
            return false;
        }
        self.reset(filter.clone());
        true
    }

    /// Resets to page 1 under `filter` even when the key is unchanged.
    pub fn reset(&mut self, filter: FilterKey) {
        self.fetched.clear();
        self.page = FIRST_PAGE;
        self.filter = Some(filter);
    }

    /// Marks `page` as requested before the network call resolves.
    pub fn on_fetch_start(&mut self, page: u32) {
        self.fetched.insert(page);
    }

    /// Checks and marks in one step, moving the cursor up to `page`.
    /// Returns `false` for a duplicate trigger, leaving the cursor alone.
    pub fn claim(&mut self, page: u32, filter: &FilterKey) -> bool {
        if !self.should_fetch(page, filter) {
            debug!(page, %filter, "duplicate page trigger suppressed");
            return false;
        }
        self.on_filter_change(filter);
        self.on_fetch_start(page);
        self.page = self.page.max(page);
        true
    }

    /// The page following the cursor.
    pub fn next_page(&self) -> u32 {
        self.page.saturating_add(1)
    }

    /// Forgets that `page` was requested so it may be fetched again.
    pub fn release(&mut self, page: u32) {
        self.fetched.remove(&page);
    }

    /// Number of pages requested under the current key.
    pub fn fetched_count(&self) -> usize {
        self.fetched.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(sector: &str) -> FilterKey {
        FilterKey::new().with("sectorId", sector)
    }

    #[test]
    fn overlapping_triggers_fetch_once() {
        let mut tracker = CursorTracker::new();
        tracker.on_filter_change(&key("a"));

        assert!(tracker.should_fetch(2, &key("a")));
        tracker.on_fetch_start(2);
        assert!(!tracker.should_fetch(2, &key("a")));

        tracker.on_filter_change(&key("b"));
        assert!(tracker.should_fetch(2, &key("b")));
    }

    #[test]
    fn claim_is_check_and_mark() {
        let mut tracker = CursorTracker::new();
        assert!(tracker.claim(2, &key("a")));
        assert!(!tracker.claim(2, &key("a")));
        assert!(tracker.claim(2, &key("b")));
        assert_eq!(tracker.filter(), Some(&key("b")));
    }

    #[test]
    fn unseen_key_always_fetches() {
        let mut tracker = CursorTracker::new();
        tracker.on_filter_change(&key("a"));
        tracker.on_fetch_start(1);
        assert!(tracker.should_fetch(1, &key("other")));
    }

    #[test]
    fn filter_change_resets_cursor_and_pages() {
        let mut tracker = CursorTracker::new();
        assert!(tracker.on_filter_change(&key("a")));
        tracker.on_fetch_start(1);
        assert!(tracker.claim(tracker.next_page(), &key("a")));
        assert_eq!(tracker.page(), 2);
        assert_eq!(tracker.fetched_count(), 2);

        assert!(!tracker.on_filter_change(&key("a")));
        assert_eq!(tracker.page(), 2);

        assert!(tracker.on_filter_change(&key("b")));
        assert_eq!(tracker.page(), FIRST_PAGE);
        assert_eq!(tracker.fetched_count(), 0);
    }

    #[test]
    fn cursor_only_moves_forward_on_claim() {
        let mut tracker = CursorTracker::new();
        assert!(tracker.claim(1, &key("a")));
        assert!(tracker.claim(3, &key("a")));
        assert_eq!(tracker.page(), 3);
        assert_eq!(tracker.next_page(), 4);

        assert!(tracker.claim(2, &key("a")));
        assert_eq!(tracker.page(), 3);
        assert!(!tracker.claim(3, &key("a")));
        assert_eq!(tracker.page(), 3);
    }

    #[test]
    fn released_page_can_be_claimed_again() {
        let mut tracker = CursorTracker::new();
        assert!(tracker.claim(1, &key("a")));
        tracker.release(1);
        assert!(!tracker.is_fetched(1));
        assert!(tracker.claim(1, &key("a")));
    }
}

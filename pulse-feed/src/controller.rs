//! Pagination controller owned by one listing view.
//!
//! [`FeedController`] ties the cursor tracker, the result merger, the
//! grouping policy and the visibility sentinel into one explicit state
//! machine:
//!
//! ```text
//! Idle ──trigger──▶ Fetching ──ok, more──▶ Idle
//!   ▲                  │ └────ok, last──▶ Exhausted
//!   │                  └──────failure───▶ Error ──trigger──▶ Fetching
//!   └──────────── filter change / refresh (from any state) ──────────┘
//! ```
//!
//! The controller never performs I/O. It hands out [`PageRequest`]s and is
//! fed their outcomes through [`FeedController::apply`]; requests carry the
//! filter key and a tag so responses that arrive after a filter change are
//! discarded instead of being merged into the new listing.

use std::time::Instant;

use tracing::{debug, warn};

use crate::{
    config::{FailedPagePolicy, FeedConfig},
    cursor::{CursorTracker, FIRST_PAGE},
    error::FeedError,
    filter::FilterKey,
    grouping::{DisplayList, GroupingPolicy},
    item::{ItemId, ResultItem},
    merge::merge_items,
    page::{PageRequest, PageResponse, RequestId},
    sentinel::{Sentinel, VisibilityEvent},
};

/// Loading state of a listing view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FeedPhase {
    /// Nothing in flight, more pages may follow.
    #[default]
    Idle,
    /// A page request is in flight.
    Fetching {
        /// Page being fetched.
        page: u32,
    },
    /// The last request failed; loaded rows stay visible.
    Error(FeedError),
    /// The server reported no further pages.
    Exhausted,
}

/// What [`FeedController::apply`] did with a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The page was merged into the listing.
    Applied {
        /// Page that was applied.
        page: u32,
        /// Items that were not shown before.
        added: usize,
        /// Whether more pages follow.
        has_more: bool,
    },
    /// The request failed and the view is now in the error state.
    Failed(FeedError),
    /// The response belonged to a superseded request and was ignored.
    Discarded,
}

/// Read-only view of the controller state for renderers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedSnapshot {
    /// Active filters.
    pub filter: FilterKey,
    /// Rows to render.
    pub display: DisplayList,
    /// Loading state.
    pub phase: FeedPhase,
    /// Whether more pages may follow.
    pub has_more: bool,
    /// Current page cursor.
    pub page: u32,
    /// Informational total reported by the server.
    pub total_count: Option<u64>,
}

impl FeedSnapshot {
    /// Inline error message, when the last request failed.
    pub fn error_message(&self) -> Option<String> {
        match &self.phase {
            FeedPhase::Error(err) => Some(err.user_message()),
            _ => None,
        }
    }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, FeedPhase::Fetching { .. })
    }
}

/// Per-view pagination state machine.
#[derive(Clone, Debug)]
pub struct FeedController {
    config: FeedConfig,
    grouping: GroupingPolicy,
    tracker: CursorTracker,
    items: Vec<ResultItem>,
    display: DisplayList,
    has_more: bool,
    total_count: Option<u64>,
    phase: FeedPhase,
    sentinel: Sentinel,
    in_flight: Option<PageRequest>,
    failed_page: Option<u32>,
    next_request: u64,
}

impl Default for FeedController {
    fn default() -> Self {
        Self::new(FeedConfig::default())
    }
}

impl FeedController {
    /// Creates an empty controller. Nothing is requested until a filter is
    /// set or [`refresh`](Self::refresh) is called.
    pub fn new(config: FeedConfig) -> Self {
        Self {
            grouping: config.grouping(),
            sentinel: config.sentinel(),
            config,
            tracker: CursorTracker::new(),
            items: Vec::new(),
            display: DisplayList::default(),
            has_more: true,
            total_count: None,
            phase: FeedPhase::Idle,
            in_flight: None,
            failed_page: None,
            next_request: 0,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Active filters, once one was set.
    pub fn filter(&self) -> Option<&FilterKey> {
        self.tracker.filter()
    }

    /// Current page cursor.
    pub fn page(&self) -> u32 {
        self.tracker.page()
    }

    /// Loading state.
    pub fn phase(&self) -> &FeedPhase {
        &self.phase
    }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, FeedPhase::Fetching { .. })
    }

    /// Whether more pages may follow.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Accumulated, deduplicated items in arrival order.
    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    /// Rows to render.
    pub fn display(&self) -> &DisplayList {
        &self.display
    }

    /// The request currently in flight.
    pub fn in_flight(&self) -> Option<&PageRequest> {
        self.in_flight.as_ref()
    }

    /// Row the sentinel is attached to, if any.
    pub fn sentinel_target(&self) -> Option<&ItemId> {
        self.sentinel.observed()
    }

    /// Copies the state a renderer needs.
    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            filter: self.tracker.filter().cloned().unwrap_or_default(),
            display: self.display.clone(),
            phase: self.phase.clone(),
            has_more: self.has_more,
            page: self.tracker.page(),
            total_count: self.total_count,
        }
    }

    /// Switches to `filter`. When it differs from the active key, all
    /// accumulated state is dropped and page 1 is requested.
    pub fn set_filter(&mut self, filter: FilterKey) -> Option<PageRequest> {
        if !self.tracker.on_filter_change(&filter) {
            return None;
        }
        debug!(%filter, "filter changed, resetting feed");
        self.clear_results();
        self.issue(FIRST_PAGE)
    }

    /// Drops everything and reloads page 1 under the current filters.
    pub fn refresh(&mut self) -> Option<PageRequest> {
        let filter = self.tracker.filter().cloned().unwrap_or_default();
        debug!(%filter, "refreshing feed");
        self.tracker.reset(filter);
        self.clear_results();
        self.issue(FIRST_PAGE)
    }

    /// Requests `page` directly, subject to the in-flight and duplicate
    /// guards.
    pub fn request_page(&mut self, page: u32) -> Option<PageRequest> {
        if self.is_loading() {
            debug!(page, "fetch already in flight");
            return None;
        }
        if !self.has_more && page != FIRST_PAGE {
            debug!(page, "feed exhausted");
            return None;
        }
        self.issue(page)
    }

    /// Feeds a visibility event for a rendered row. Returns the next page
    /// request when the event triggers one.
    ///
    /// Nothing is requested while a fetch is in flight or after the last
    /// page, whatever the event says.
    pub fn on_visibility(&mut self, event: &VisibilityEvent, now: Instant) -> Option<PageRequest> {
        if self.is_loading() || !self.has_more {
            return None;
        }
        if !self.sentinel.on_visibility(event, now) {
            return None;
        }

        let page = match (self.config.failed_pages, self.failed_page) {
            (FailedPagePolicy::Release, Some(page)) => page,
            _ => self.tracker.next_page(),
        };
        self.request_page(page)
    }

    /// Applies the outcome of `request`.
    pub fn apply(
        &mut self,
        request: &PageRequest,
        result: Result<PageResponse, FeedError>,
    ) -> ApplyOutcome {
        let current = self.in_flight.as_ref().is_some_and(|in_flight| in_flight.id == request.id);
        if !current || self.tracker.filter() != Some(&request.filter) {
            debug!(request = %request.id, page = request.page, "discarding stale response");
            return ApplyOutcome::Discarded;
        }
        self.in_flight = None;

        match result {
            Ok(response) => self.apply_page(request, response),
            Err(err) => self.apply_failure(request, err),
        }
    }

    fn apply_page(&mut self, request: &PageRequest, response: PageResponse) -> ApplyOutcome {
        let added = if request.is_reset() {
            self.items = merge_items(&[], &response.items, true);
            self.display = self.grouping.build(&self.items);
            self.items.len()
        } else {
            let previous_len = self.items.len();
            let merged = merge_items(&self.items, &response.items, false);
            self.grouping.append(&mut self.display, &merged[previous_len..]);
            self.items = merged;
            self.items.len() - previous_len
        };

        self.has_more = response.has_more;
        self.total_count = response.total_count.or(self.total_count);
        if self.failed_page == Some(request.page) {
            self.failed_page = None;
        }
        self.phase = if self.has_more {
            FeedPhase::Idle
        } else {
            FeedPhase::Exhausted
        };
        self.sentinel.sync(self.display.last_key(), self.has_more);

        debug!(
            page = request.page,
            added,
            rows = self.display.len(),
            has_more = self.has_more,
            "page applied"
        );
        ApplyOutcome::Applied {
            page: request.page,
            added,
            has_more: self.has_more,
        }
    }

    fn apply_failure(&mut self, request: &PageRequest, err: FeedError) -> ApplyOutcome {
        warn!(page = request.page, error = %err, "page fetch failed");
        if self.config.failed_pages == FailedPagePolicy::Release {
            self.tracker.release(request.page);
            self.failed_page = Some(request.page);
        }
        self.phase = FeedPhase::Error(err.clone());
        self.sentinel.sync(self.display.last_key(), self.has_more);
        ApplyOutcome::Failed(err)
    }

    fn clear_results(&mut self) {
        self.items.clear();
        self.display.clear();
        self.has_more = true;
        self.total_count = None;
        self.phase = FeedPhase::Idle;
        self.in_flight = None;
        self.failed_page = None;
        self.sentinel.reset();
    }

    fn issue(&mut self, page: u32) -> Option<PageRequest> {
        let filter = self.tracker.filter().cloned().unwrap_or_default();
        if !self.tracker.claim(page, &filter) {
            return None;
        }

        self.next_request += 1;
        let request = PageRequest {
            id: RequestId::new(self.next_request),
            page,
            filter,
        };
        self.in_flight = Some(request.clone());
        self.phase = FeedPhase::Fetching { page };
        self.sentinel.sync(None, false);
        debug!(request = %request.id, page, "page requested");
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, time::Duration};

    use proptest::prelude::*;

    use super::*;
    use crate::grouping::DisplayEntry;

    fn grouped(id: &str, order: i32) -> ResultItem {
        ResultItem::new(id, order, "Type-One")
    }

    fn single(id: &str, order: i32) -> ResultItem {
        ResultItem::new(id, order, "Type-Two")
    }

    fn sector(id: &str) -> FilterKey {
        FilterKey::new().with("sectorId", id)
    }

    fn shape(controller: &FeedController) -> Vec<Vec<&str>> {
        controller
            .display()
            .entries()
            .iter()
            .map(|entry| entry.items().iter().map(|item| item.id.as_str()).collect())
            .collect()
    }

    /// Reports the last row as visible, one second after `at`.
    fn scroll_to_end(controller: &mut FeedController, at: &mut Instant) -> Option<PageRequest> {
        *at += Duration::from_secs(1);
        let target = controller.display().last_key()?.clone();
        controller.on_visibility(&VisibilityEvent::visible(target), *at)
    }

    #[test]
    fn filter_change_requests_first_page_once() {
        let mut controller = FeedController::default();
        let request = controller.set_filter(sector("s1")).expect("first page");
        assert_eq!(request.page, 1);
        assert!(controller.is_loading());
        assert!(controller.set_filter(sector("s1")).is_none());
        assert!(controller.request_page(1).is_none());
    }

    #[test]
    fn group_completes_across_pages() {
        let mut controller = FeedController::default();
        let mut now = Instant::now();

        let first = controller.set_filter(sector("s1")).expect("page 1");
        controller.apply(&first, Ok(PageResponse::new(vec![grouped("a", 1), grouped("b", 2)], true)));
        assert_eq!(controller.sentinel_target().map(ItemId::as_str), Some("a"));

        let second = scroll_to_end(&mut controller, &mut now).expect("page 2");
        assert_eq!(second.page, 2);
        let outcome = controller.apply(&second, Ok(PageResponse::new(vec![grouped("c", 3)], false)));

        assert_eq!(outcome, ApplyOutcome::Applied { page: 2, added: 1, has_more: false });
        assert_eq!(shape(&controller), [vec!["a", "b", "c"]]);
        assert!(matches!(controller.display().entries()[0], DisplayEntry::Group(_)));
        assert_eq!(controller.phase(), &FeedPhase::Exhausted);
    }

    #[test]
    fn duplicate_delivery_is_not_shown_twice() {
        let mut controller = FeedController::default();
        let mut now = Instant::now();

        let first = controller.set_filter(sector("s1")).expect("page 1");
        controller.apply(&first, Ok(PageResponse::new(vec![single("x", 1), grouped("a", 2)], true)));
        let second = scroll_to_end(&mut controller, &mut now).expect("page 2");
        let outcome = controller.apply(
            &second,
            Ok(PageResponse::new(vec![single("x", 1), grouped("a", 2), grouped("b", 3)], true)),
        );

        assert_eq!(outcome, ApplyOutcome::Applied { page: 2, added: 1, has_more: true });
        assert_eq!(shape(&controller), [vec!["x"], vec!["a", "b"]]);
        assert_eq!(controller.display().item_count(), controller.items().len());
    }

    #[test]
    fn filter_change_clears_everything() {
        let mut controller = FeedController::default();
        let mut now = Instant::now();

        let first = controller.set_filter(sector("s1")).expect("page 1");
        controller.apply(&first, Ok(PageResponse::new(vec![single("x", 1)], true)));
        let second = scroll_to_end(&mut controller, &mut now).expect("page 2");
        controller.apply(&second, Ok(PageResponse::new(vec![single("y", 2)], true)));
        assert_eq!(controller.page(), 2);

        let reset = controller.set_filter(sector("s2")).expect("page 1 again");
        assert_eq!(reset.page, 1);
        assert_eq!(controller.page(), 1);
        assert!(controller.display().is_empty());
        assert!(controller.items().is_empty());
        assert!(controller.has_more());
        assert_eq!(controller.sentinel_target(), None);
    }

    #[test]
    fn stale_response_after_filter_change_is_discarded() {
        let mut controller = FeedController::default();

        let old = controller.set_filter(sector("s1")).expect("page 1");
        let new = controller.set_filter(sector("s2")).expect("page 1 for s2");

        assert_eq!(
            controller.apply(&old, Ok(PageResponse::new(vec![single("stale", 1)], true))),
            ApplyOutcome::Discarded
        );
        assert!(controller.display().is_empty());
        assert!(controller.is_loading());

        controller.apply(&new, Ok(PageResponse::new(vec![single("fresh", 1)], true)));
        assert_eq!(shape(&controller), [vec!["fresh"]]);
    }

    #[test]
    fn sentinel_is_guarded_while_loading_and_after_last_page() {
        let mut controller = FeedController::default();
        let mut now = Instant::now();

        let first = controller.set_filter(sector("s1")).expect("page 1");
        now += Duration::from_secs(1);
        assert!(controller.on_visibility(&VisibilityEvent::visible("x"), now).is_none());
        assert_eq!(controller.page(), 1);

        controller.apply(&first, Ok(PageResponse::new(vec![single("x", 1)], false)));
        now += Duration::from_secs(1);
        assert!(controller.on_visibility(&VisibilityEvent::visible("x"), now).is_none());
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.phase(), &FeedPhase::Exhausted);
    }

    #[test]
    fn failure_keeps_rows_and_moves_past_the_failed_page() {
        let mut controller = FeedController::default();
        let mut now = Instant::now();

        let first = controller.set_filter(sector("s1")).expect("page 1");
        controller.apply(&first, Ok(PageResponse::new(vec![single("x", 1)], true)));
        let second = scroll_to_end(&mut controller, &mut now).expect("page 2");
        let err = FeedError::Status { page: 2, status: 502 };
        assert_eq!(controller.apply(&second, Err(err.clone())), ApplyOutcome::Failed(err));

        assert_eq!(shape(&controller), [vec!["x"]]);
        assert!(controller.snapshot().error_message().is_some());
        assert!(controller.request_page(2).is_none());

        let third = scroll_to_end(&mut controller, &mut now).expect("next page");
        assert_eq!(third.page, 3);
    }

    #[test]
    fn release_policy_retries_the_failed_page() {
        let config = FeedConfig::default().failed_pages(FailedPagePolicy::Release);
        let mut controller = FeedController::new(config);
        let mut now = Instant::now();

        let first = controller.set_filter(sector("s1")).expect("page 1");
        controller.apply(&first, Ok(PageResponse::new(vec![single("x", 1)], true)));
        let second = scroll_to_end(&mut controller, &mut now).expect("page 2");
        controller.apply(&second, Err(FeedError::Transport { page: 2, message: "reset".into() }));

        let retry = scroll_to_end(&mut controller, &mut now).expect("retry");
        assert_eq!(retry.page, 2);
        controller.apply(&retry, Ok(PageResponse::new(vec![single("y", 2)], true)));
        let next = scroll_to_end(&mut controller, &mut now).expect("page 3");
        assert_eq!(next.page, 3);
    }

    #[test]
    fn refresh_reloads_first_page_with_same_filter() {
        let mut controller = FeedController::default();

        let first = controller.set_filter(sector("s1")).expect("page 1");
        controller.apply(&first, Ok(PageResponse::new(vec![single("x", 1)], false)));
        assert_eq!(controller.phase(), &FeedPhase::Exhausted);

        let again = controller.refresh().expect("refresh");
        assert_eq!(again.page, 1);
        assert_eq!(again.filter, sector("s1"));
        assert!(controller.display().is_empty());
        assert_eq!(controller.apply(&first, Ok(PageResponse::default())), ApplyOutcome::Discarded);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut controller = FeedController::default();
        let first = controller.set_filter(sector("s1")).expect("page 1");
        assert!(controller.snapshot().is_loading());

        let mut response = PageResponse::new(vec![grouped("a", 1)], true);
        response.total_count = Some(7);
        controller.apply(&first, Ok(response));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.filter, sector("s1"));
        assert_eq!(snapshot.total_count, Some(7));
        assert_eq!(snapshot.page, 1);
        assert_eq!(snapshot.display.len(), 1);
        assert_eq!(snapshot.error_message(), None);
    }

    #[test]
    fn direct_request_moves_the_cursor() {
        let mut controller = FeedController::default();
        let mut now = Instant::now();

        let first = controller.set_filter(sector("s1")).expect("page 1");
        controller.apply(&first, Ok(PageResponse::new(vec![single("x", 1)], true)));
        let jump = controller.request_page(3).expect("page 3");
        controller.apply(&jump, Ok(PageResponse::new(vec![single("z", 3)], true)));
        assert_eq!(controller.page(), 3);

        let next = scroll_to_end(&mut controller, &mut now).expect("scroll after jump");
        assert_eq!(next.page, 4);
    }

    fn arb_page() -> impl Strategy<Value = Vec<ResultItem>> {
        prop::collection::vec((0u8..24, -5i32..5, any::<bool>()), 0..9).prop_map(|raw| {
            raw.into_iter()
                .map(|(id, order, grouped)| {
                    let container = if grouped { "Type-One" } else { "Type-Two" };
                    ResultItem::new(format!("item-{id}"), order, container)
                })
                .collect()
        })
    }

    fn check_display(controller: &FeedController, group_size: usize) -> Result<(), TestCaseError> {
        let display = controller.display();
        let mut seen = HashSet::new();
        for item in display.items() {
            prop_assert!(seen.insert(&item.id), "{} rendered twice", item.id);
        }
        prop_assert_eq!(display.item_count(), controller.items().len());

        let mut underfull = 0;
        for entry in display.entries() {
            if let DisplayEntry::Group(group) = entry {
                prop_assert!(!group.is_empty() && group.len() <= group_size);
                if group.len() < group_size {
                    underfull += 1;
                }
            }
        }
        prop_assert!(underfull <= 1, "{underfull} under-full groups");
        Ok(())
    }

    proptest! {
        #[test]
        fn paging_never_renders_an_item_twice(
            pages in prop::collection::vec(arb_page(), 1..7),
            group_size in 1usize..5,
        ) {
            let mut controller = FeedController::new(FeedConfig::default().group_size(group_size));
            let mut now = Instant::now();
            let mut request = controller.set_filter(sector("s1"));

            for page in pages {
                let Some(current) = request.take() else {
                    break;
                };
                controller.apply(&current, Ok(PageResponse::new(page, true)));
                check_display(&controller, group_size)?;
                request = scroll_to_end(&mut controller, &mut now);
            }
        }
    }
}

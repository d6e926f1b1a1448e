//! Where pages come from.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use parking_lot::Mutex;
use pulse_feed::{FeedError, PageRequest, PageResponse, ResultItem};

/// A paginated listing endpoint.
pub trait PageSource: Send + Sync + 'static {
    /// Fetches `request.page` under `request.filter`.
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<PageResponse, FeedError>> + Send;
}

impl<S: PageSource> PageSource for Arc<S> {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<PageResponse, FeedError>> + Send {
        (**self).fetch_page(request)
    }
}

/// In-memory listing, for demos and tests.
///
/// Items match a request when every filter equals the item's field of the
/// same name. Matching items are served in fixed-size pages.
pub struct MemoryPageSource {
    items: Vec<ResultItem>,
    page_size: usize,
    delay: Duration,
    failures: Mutex<HashMap<u32, FeedError>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MemoryPageSource {
    /// Serves `items` in pages of `page_size` (at least one).
    pub fn new(items: Vec<ResultItem>, page_size: usize) -> Self {
        Self {
            items,
            page_size: page_size.max(1),
            delay: Duration::ZERO,
            failures: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Delays every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes the next request for `page` fail with `error`.
    pub fn fail_next(&self, page: u32, error: FeedError) {
        self.failures.lock().insert(page, error);
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().clone()
    }

    fn page(&self, request: &PageRequest) -> PageResponse {
        let matching: Vec<&ResultItem> = self
            .items
            .iter()
            .filter(|item| {
                request
                    .filter
                    .iter()
                    .all(|(name, value)| item.field_str(name) == Some(value))
            })
            .collect();

        let start = (request.page.saturating_sub(1) as usize).saturating_mul(self.page_size);
        let end = start.saturating_add(self.page_size).min(matching.len());
        let items = matching
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|item| (*item).clone())
            .collect();

        PageResponse {
            items,
            has_more: end < matching.len(),
            total_count: Some(matching.len() as u64),
        }
    }
}

impl PageSource for MemoryPageSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FeedError> {
        self.requests.lock().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(error) = self.failures.lock().remove(&request.page) {
            return Err(error);
        }
        Ok(self.page(request))
    }
}

//! Listing endpoints over HTTP.

use std::time::Duration;

use pulse_feed::{
    FeedConfig, FeedError, ListingView, PageEnvelope, PageRequest, PageResponse, RetryPolicy,
};
use reqwest::{Client, Url};
use tracing::{debug, instrument, warn};

use crate::{error::ShardError, source::PageSource};

/// Fetches pages of one listing view from a JSON API.
///
/// Requests are `GET {base}{endpoint}?page=N&limit=M&<filters>`; the body is
/// the `{ success, data, hasMore, totalCount }` envelope.
#[derive(Clone, Debug)]
pub struct HttpPageSource {
    client: Client,
    endpoint: Url,
    page_size: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpPageSource {
    /// Creates a source for `view` served under `base_url`.
    pub fn new(base_url: &str, view: ListingView, config: &FeedConfig) -> Result<Self, ShardError> {
        let endpoint = endpoint_url(base_url, view)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            endpoint,
            page_size: config.page_size,
            timeout: config.request_timeout(),
            retry: config.retry.clone(),
        })
    }

    /// Full URL requested for `request`.
    pub fn request_url(&self, request: &PageRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &request.page.to_string());
            query.append_pair("limit", &self.page_size.to_string());
            for (name, value) in request.filter.iter() {
                query.append_pair(name, value);
            }
        }
        url
    }

    async fn fetch_once(&self, request: &PageRequest) -> Result<PageResponse, FeedError> {
        let page = request.page;
        let response = self
            .client
            .get(self.request_url(request))
            .send()
            .await
            .map_err(|err| self.transport_error(page, &err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(page, &err))?;
        PageEnvelope::parse(&body, page)
    }

    fn transport_error(&self, page: u32, err: &reqwest::Error) -> FeedError {
        if err.is_timeout() {
            FeedError::Timeout {
                page,
                elapsed: self.timeout,
            }
        } else {
            FeedError::Transport {
                page,
                message: err.to_string(),
            }
        }
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip_all, fields(page = request.page, filter = %request.filter))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FeedError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(request).await {
                Ok(page) => {
                    debug!(attempt, items = page.items.len(), has_more = page.has_more, "page fetched");
                    return Ok(page);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let backoff = self.retry.backoff(attempt);
                    warn!(attempt, error = %err, ?backoff, "transient failure, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn endpoint_url(base_url: &str, view: ListingView) -> Result<Url, ShardError> {
    let base = Url::parse(base_url).map_err(|err| ShardError::InvalidBaseUrl {
        url: base_url.to_owned(),
        reason: err.to_string(),
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ShardError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: format!("unsupported scheme `{}`", base.scheme()),
        });
    }

    let mut endpoint = base;
    let path = format!("{}{}", endpoint.path().trim_end_matches('/'), view.endpoint());
    endpoint.set_path(&path);
    endpoint.set_query(None);
    Ok(endpoint)
}

//! Page requests and the listing endpoint's response envelope.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::FeedError, filter::FilterKey, item::ResultItem};

/// Identifies one issued page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A page fetch the controller wants performed.
///
/// The filter key travels with the request so a response can be checked
/// against the view's state at apply time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// Request tag.
    pub id: RequestId,
    /// Page number, starting at 1.
    pub page: u32,
    /// Filters active when the request was issued.
    pub filter: FilterKey,
}

impl PageRequest {
    /// Whether this request replaces everything loaded so far.
    pub fn is_reset(&self) -> bool {
        self.page == crate::cursor::FIRST_PAGE
    }
}

/// A validated page of results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageResponse {
    /// Items in server order.
    pub items: Vec<ResultItem>,
    /// Whether another page exists.
    pub has_more: bool,
    /// Informational total, if the server sent one.
    pub total_count: Option<u64>,
}

impl PageResponse {
    /// Creates a response without a total.
    pub fn new(items: Vec<ResultItem>, has_more: bool) -> Self {
        Self {
            items,
            has_more,
            total_count: None,
        }
    }
}

/// The JSON body returned by listing endpoints, before validation.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope {
    /// Server-side success flag.
    #[serde(default)]
    pub success: bool,
    /// Page items.
    #[serde(default)]
    pub data: Option<Vec<ResultItem>>,
    /// More pages available.
    #[serde(default)]
    pub has_more: Option<bool>,
    /// Informational total.
    #[serde(default)]
    pub total_count: Option<u64>,
    /// Error or status message.
    #[serde(default)]
    pub message: Option<String>,
}

impl PageEnvelope {
    /// Validates the envelope for `page`.
    pub fn into_response(self, page: u32) -> Result<PageResponse, FeedError> {
        if !self.success {
            return Err(FeedError::Rejected {
                page,
                message: self.message.unwrap_or_default(),
            });
        }
        let items = self.data.ok_or_else(|| FeedError::Malformed {
            page,
            reason: "missing `data`".to_owned(),
        })?;
        let has_more = self.has_more.ok_or_else(|| FeedError::Malformed {
            page,
            reason: "missing `hasMore`".to_owned(),
        })?;

        Ok(PageResponse {
            items,
            has_more,
            total_count: self.total_count,
        })
    }

    /// Decodes and validates a raw body.
    pub fn parse(body: &[u8], page: u32) -> Result<PageResponse, FeedError> {
        let envelope: Self = serde_json::from_slice(body).map_err(|err| FeedError::Malformed {
            page,
            reason: err.to_string(),
        })?;
        envelope.into_response(page)
    }
}

//! Feed configuration.
//!
//! ## Usage
//!
//! Start from [`FeedConfig::default`] and override with the generated
//! setters, or load a TOML file:
//!
//! ```toml
//! grouped_type = "Type-One"
//! page_size = 12
//! debounce_ms = 250
//!
//! [retry]
//! max_attempts = 3
//! base_backoff_ms = 200
//! ```

use std::{fs, path::Path, time::Duration};

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, grouping::GroupingPolicy, sentinel::Sentinel};

/// What happens to a page number whose request failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedPagePolicy {
    /// The page stays marked as fetched: the next trigger moves on to the
    /// following page and the failed one is only reloaded by a refresh or
    /// filter change.
    #[default]
    KeepMarked,
    /// The page is released: the next trigger requests it again.
    Release,
}

/// Retry behaviour for transient fetch failures.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Setters)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first. `1` disables retry.
    pub max_attempts: u32,
    /// Backoff before attempt `n + 1` is `n * base_backoff_ms`.
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_backoff_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Settings shared by every listing view.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Setters)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// Container type rendered 3-up.
    #[setters(into)]
    pub grouped_type: String,
    /// Cards per grouped row.
    pub group_size: usize,
    /// Items requested per page.
    pub page_size: u32,
    /// Minimum time between two sentinel triggers.
    pub debounce_ms: u64,
    /// Intersection ratio at which the last row counts as visible.
    pub visibility_threshold: f32,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    /// Handling of failed page numbers.
    pub failed_pages: FailedPagePolicy,
    /// Retry of transient failures.
    pub retry: RetryPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            grouped_type: "Type-One".to_owned(),
            group_size: crate::grouping::DEFAULT_GROUP_SIZE,
            page_size: 10,
            debounce_ms: 300,
            visibility_threshold: crate::sentinel::DEFAULT_THRESHOLD,
            request_timeout_ms: 15_000,
            failed_pages: FailedPagePolicy::KeepMarked,
            retry: RetryPolicy::default(),
        }
    }
}

impl FeedConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Rejects values the feed cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grouped_type.trim().is_empty() {
            return Err(ConfigError::Invalid("`grouped_type` must not be empty".into()));
        }
        if self.group_size == 0 {
            return Err(ConfigError::Invalid("`group_size` must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("`page_size` must be at least 1".into()));
        }
        if !(self.visibility_threshold > 0.0 && self.visibility_threshold <= 1.0) {
            return Err(ConfigError::Invalid(
                "`visibility_threshold` must be in (0, 1]".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("`retry.max_attempts` must be at least 1".into()));
        }
        Ok(())
    }

    /// Sentinel debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Grouping policy described by this config.
    pub fn grouping(&self) -> GroupingPolicy {
        GroupingPolicy::new(self.grouped_type.clone(), self.group_size)
    }

    /// A detached sentinel described by this config.
    pub fn sentinel(&self) -> Sentinel {
        Sentinel::new(self.visibility_threshold, self.debounce())
    }
}

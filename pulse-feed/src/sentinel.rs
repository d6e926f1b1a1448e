//! Visibility sentinel on the final row of a feed.
//!
//! The sentinel observes exactly one row: the last entry of the display list.
//! Renderers report intersection changes as [`VisibilityEvent`]s; the sentinel
//! turns them into at most one "load the next page" trigger per debounce
//! window. Whether a trigger is allowed at all (nothing in flight, more pages
//! available) is decided by whoever owns the sentinel.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::item::ItemId;

/// Default debounce window between two accepted triggers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default intersection ratio at which the last row counts as visible.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// An intersection change reported for a rendered row.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibilityEvent {
    /// Key of the row the observation belongs to.
    pub target: ItemId,
    /// Fraction of the row inside the viewport, `0.0..=1.0`.
    pub intersection_ratio: f32,
}

impl VisibilityEvent {
    /// Creates an event for `target`.
    pub fn new(target: impl Into<ItemId>, intersection_ratio: f32) -> Self {
        Self {
            target: target.into(),
            intersection_ratio,
        }
    }

    /// A fully visible row.
    pub fn visible(target: impl Into<ItemId>) -> Self {
        Self::new(target, 1.0)
    }
}

/// Result of re-synchronising the observation with the rendered list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentinelChange {
    /// The observation moved to a new row.
    Attached(ItemId),
    /// The observation was dropped.
    Detached,
    /// Nothing changed.
    Unchanged,
}

/// Debounced observer of the last rendered row.
#[derive(Clone, Debug)]
pub struct Sentinel {
    observed: Option<ItemId>,
    threshold: f32,
    debounce: Duration,
    last_fired: Option<Instant>,
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_DEBOUNCE)
    }
}

impl Sentinel {
    /// Creates a detached sentinel.
    pub fn new(threshold: f32, debounce: Duration) -> Self {
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_THRESHOLD
        };
        Self {
            observed: None,
            threshold,
            debounce,
            last_fired: None,
        }
    }

    /// The row currently observed.
    pub fn observed(&self) -> Option<&ItemId> {
        self.observed.as_ref()
    }

    /// Attaches to `last` while `eligible`, detaching otherwise.
    ///
    /// Observations on rows that are no longer last are dropped, so late
    /// events for them are ignored.
    pub fn sync(&mut self, last: Option<&ItemId>, eligible: bool) -> SentinelChange {
        let next = if eligible { last } else { None };
        if self.observed.as_ref() == next {
            return SentinelChange::Unchanged;
        }

        self.observed = next.cloned();
        match next {
            Some(key) => {
                trace!(target_row = %key, "sentinel attached");
                SentinelChange::Attached(key.clone())
            }
            None => {
                trace!("sentinel detached");
                SentinelChange::Detached
            }
        }
    }

    /// Drops the observation and the debounce history.
    pub fn reset(&mut self) {
        self.observed = None;
        self.last_fired = None;
    }

    /// Returns `true` when `event` should trigger the next page.
    pub fn on_visibility(&mut self, event: &VisibilityEvent, now: Instant) -> bool {
        if self.observed.as_ref() != Some(&event.target) {
            trace!(target_row = %event.target, "visibility event for unobserved row");
            return false;
        }
        if !(event.intersection_ratio >= self.threshold && event.intersection_ratio > 0.0) {
            return false;
        }
        if let Some(last) = self.last_fired
            && now.saturating_duration_since(last) < self.debounce
        {
            trace!(target_row = %event.target, "visibility event debounced");
            return false;
        }

        self.last_fired = Some(now);
        true
    }
}

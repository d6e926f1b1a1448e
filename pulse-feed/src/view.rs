//! Listing views that page through results.

use std::{fmt, str::FromStr};

use crate::filter::FilterKey;

/// A listing page backed by its own paginated endpoint.
///
/// Every view keeps an independent [`FeedController`](crate::FeedController);
/// pagination state is never shared between views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListingView {
    /// Daily themes and contexts.
    PulseToday,
    /// Sector and signal driven trends.
    TrendAnalyzer,
    /// Influencer posts and comments.
    InfluencerComment,
}

impl ListingView {
    /// Every view, in menu order.
    pub const ALL: [Self; 3] = [Self::PulseToday, Self::TrendAnalyzer, Self::InfluencerComment];

    /// Kebab-case name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::PulseToday => "pulse-today",
            Self::TrendAnalyzer => "trend-analyzer",
            Self::InfluencerComment => "influencer-comment",
        }
    }

    /// API path of the view's listing endpoint.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::PulseToday => "/api/pulse-today",
            Self::TrendAnalyzer => "/api/trend-analyzer",
            Self::InfluencerComment => "/api/influencer-comments",
        }
    }

    /// Filter names the endpoint understands.
    pub fn filter_fields(self) -> &'static [&'static str] {
        match self {
            Self::PulseToday => &["sectorId", "subSectorId", "postType"],
            Self::TrendAnalyzer => &["sectorId", "subSectorId", "signalId", "subSignalId"],
            Self::InfluencerComment => &["sectorId", "subSectorId", "postType"],
        }
    }

    /// Filters in `key` the endpoint would ignore.
    pub fn unknown_filters<'a>(self, key: &'a FilterKey) -> Vec<&'a str> {
        let known = self.filter_fields();
        key.iter()
            .map(|(name, _)| name)
            .filter(|name| !known.contains(name))
            .collect()
    }
}

impl fmt::Display for ListingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognised view name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown listing view `{0}`")]
pub struct UnknownView(pub String);

impl FromStr for ListingView {
    type Err = UnknownView;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = crate::slug::normalize(value);
        Self::ALL
            .into_iter()
            .find(|view| view.name() == normalized)
            .ok_or_else(|| UnknownView(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_loosely() {
        assert_eq!("pulse-today".parse::<ListingView>(), Ok(ListingView::PulseToday));
        assert_eq!("Trend Analyzer".parse::<ListingView>(), Ok(ListingView::TrendAnalyzer));
        assert_eq!(
            "feed".parse::<ListingView>(),
            Err(UnknownView("feed".to_owned()))
        );
        for view in ListingView::ALL {
            assert_eq!(view.to_string().parse::<ListingView>(), Ok(view));
        }
    }

    #[test]
    fn reports_unknown_filters() {
        let key = FilterKey::new().with("sectorId", "s1").with("signalId", "x");
        assert_eq!(ListingView::PulseToday.unknown_filters(&key), ["signalId"]);
        assert!(ListingView::TrendAnalyzer.unknown_filters(&key).is_empty());
    }
}

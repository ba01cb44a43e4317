//! Point-in-time visibility rules.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Polarity, RatingEvent};

/// Rule deciding whether a rating is already visible at a cutoff instant.
///
/// Every policy admits ratings strictly before the cutoff. The tie-break
/// variants additionally admit *positive* ratings sharing the cutoff's
/// timestamp (or calendar day); negative ratings at the cutoff are never
/// visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityPolicy {
    /// `timestamp < cutoff`
    Strict,
    /// `timestamp < cutoff`, or equal timestamp and positive rating
    SameTimestampPositive,
    /// `timestamp < cutoff`, or same UTC day and positive rating
    SameDayPositive,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::Strict
    }
}

impl VisibilityPolicy {
    /// Check whether `event` is visible at `cutoff`
    pub fn is_visible(&self, event: &RatingEvent, cutoff: DateTime<Utc>) -> bool {
        if event.timestamp < cutoff {
            return true;
        }
        match self {
            VisibilityPolicy::Strict => false,
            VisibilityPolicy::SameTimestampPositive => {
                event.timestamp == cutoff && event.is_positive()
            }
            VisibilityPolicy::SameDayPositive => {
                event.timestamp.date_naive() == cutoff.date_naive() && event.is_positive()
            }
        }
    }

    /// Upper bound on the timestamp of any event visible at `cutoff`.
    ///
    /// Used to cut sorted event lists before applying [`Self::is_visible`].
    pub fn horizon(&self, cutoff: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            VisibilityPolicy::Strict | VisibilityPolicy::SameTimestampPositive => cutoff,
            VisibilityPolicy::SameDayPositive => cutoff + Duration::days(1),
        }
    }
}

/// A logical filter over the rating history: what was visible at `cutoff`
/// with the given polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalView {
    pub cutoff: DateTime<Utc>,
    pub policy: VisibilityPolicy,
    pub polarity: Polarity,
}

impl TemporalView {
    /// Create a new view
    pub fn new(cutoff: DateTime<Utc>, policy: VisibilityPolicy, polarity: Polarity) -> Self {
        Self {
            cutoff,
            policy,
            polarity,
        }
    }

    /// Check whether an event belongs to this view
    pub fn admits(&self, event: &RatingEvent) -> bool {
        self.policy.is_visible(event, self.cutoff) && self.polarity.admits(event.rating)
    }

    /// Upper bound on visible timestamps
    pub fn horizon(&self) -> DateTime<Utc> {
        self.policy.horizon(self.cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_strict_excludes_ties() {
        let cutoff = at(12, 0);
        let policy = VisibilityPolicy::Strict;
        assert!(policy.is_visible(&RatingEvent::new(1, 2, 3, at(11, 59)), cutoff));
        assert!(!policy.is_visible(&RatingEvent::new(1, 2, 3, cutoff), cutoff));
        assert!(!policy.is_visible(&RatingEvent::new(1, 2, -3, cutoff), cutoff));
    }

    #[test]
    fn test_same_timestamp_admits_only_positive() {
        let cutoff = at(12, 0);
        let policy = VisibilityPolicy::SameTimestampPositive;
        assert!(policy.is_visible(&RatingEvent::new(1, 2, 3, cutoff), cutoff));
        assert!(!policy.is_visible(&RatingEvent::new(1, 2, -3, cutoff), cutoff));
        assert!(!policy.is_visible(&RatingEvent::new(1, 2, 3, at(12, 1)), cutoff));
    }

    #[test]
    fn test_same_day_admits_positive_later_that_day() {
        let cutoff = at(12, 0);
        let policy = VisibilityPolicy::SameDayPositive;
        assert!(policy.is_visible(&RatingEvent::new(1, 2, 3, at(18, 0)), cutoff));
        assert!(!policy.is_visible(&RatingEvent::new(1, 2, -3, at(18, 0)), cutoff));
        assert!(policy.horizon(cutoff) > at(23, 59));
    }

    #[test]
    fn test_view_applies_polarity() {
        let view = TemporalView::new(at(12, 0), VisibilityPolicy::Strict, Polarity::Positive);
        assert!(view.admits(&RatingEvent::new(1, 2, 3, at(10, 0))));
        assert!(!view.admits(&RatingEvent::new(1, 2, -3, at(10, 0))));
    }
}

//! Historical rating profile of a user before a cutoff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Polarity, RatingEvent, RatingStore, Role, UserId};
use crate::error::{FeatureError, Result};

/// Default cap on the consecutive negative ratings streak
pub const DEFAULT_STREAK_CAP: usize = 3;

/// What a user has received so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetHistory {
    pub num_ratings_received: usize,
    pub num_neg_received: usize,
    pub num_pos_received: usize,
    pub neg_ratings_pct: f64,
    pub rating_received_sum: i64,
    pub rating_received_avg: f64,
    pub days_since_first_rating_target: i64,
    pub days_since_last_rating_target: i64,
    pub last_rating_neg: bool,
}

impl TargetHistory {
    pub const NAMES: [&'static str; 9] = [
        "num_ratings_received",
        "num_neg_received",
        "num_pos_received",
        "neg_ratings_pct",
        "rating_received_sum",
        "rating_received_avg",
        "days_since_first_rating_target",
        "days_since_last_rating_target",
        "last_rating_neg",
    ];

    fn from_events(events: &[&RatingEvent], cutoff: DateTime<Utc>) -> Self {
        let (Some(first), Some(last)) = (events.first(), events.last()) else {
            return Self::default();
        };

        let count = events.len();
        let negative = events.iter().filter(|e| e.is_negative()).count();
        let sum: i64 = events.iter().map(|e| e.rating as i64).sum();

        Self {
            num_ratings_received: count,
            num_neg_received: negative,
            num_pos_received: count - negative,
            neg_ratings_pct: negative as f64 / count as f64,
            rating_received_sum: sum,
            rating_received_avg: sum as f64 / count as f64,
            days_since_first_rating_target: whole_days(cutoff, first.timestamp),
            days_since_last_rating_target: whole_days(cutoff, last.timestamp),
            last_rating_neg: last.is_negative(),
        }
    }

    pub fn values(&self) -> Vec<f64> {
        vec![
            self.num_ratings_received as f64,
            self.num_neg_received as f64,
            self.num_pos_received as f64,
            self.neg_ratings_pct,
            self.rating_received_sum as f64,
            self.rating_received_avg,
            self.days_since_first_rating_target as f64,
            self.days_since_last_rating_target as f64,
            if self.last_rating_neg { 1.0 } else { 0.0 },
        ]
    }
}

/// What a user has given so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceHistory {
    pub num_ratings_given: usize,
    pub rating_given_avg: f64,
    pub days_since_first_rating_source: i64,
    pub days_since_last_rating_source: i64,
}

impl SourceHistory {
    pub const NAMES: [&'static str; 4] = [
        "num_ratings_given",
        "rating_given_avg",
        "days_since_first_rating_source",
        "days_since_last_rating_source",
    ];

    fn from_events(events: &[&RatingEvent], cutoff: DateTime<Utc>) -> Self {
        let (Some(first), Some(last)) = (events.first(), events.last()) else {
            return Self::default();
        };

        let sum: i64 = events.iter().map(|e| e.rating as i64).sum();
        Self {
            num_ratings_given: events.len(),
            rating_given_avg: sum as f64 / events.len() as f64,
            days_since_first_rating_source: whole_days(cutoff, first.timestamp),
            days_since_last_rating_source: whole_days(cutoff, last.timestamp),
        }
    }

    pub fn values(&self) -> Vec<f64> {
        vec![
            self.num_ratings_given as f64,
            self.rating_given_avg,
            self.days_since_first_rating_source as f64,
            self.days_since_last_rating_source as f64,
        ]
    }
}

/// Profile for one role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HistoryFeatures {
    Target(TargetHistory),
    Source(SourceHistory),
}

impl HistoryFeatures {
    pub fn values(&self) -> Vec<f64> {
        match self {
            HistoryFeatures::Target(h) => h.values(),
            HistoryFeatures::Source(h) => h.values(),
        }
    }

    pub fn names(&self) -> &'static [&'static str] {
        match self {
            HistoryFeatures::Target(_) => &TargetHistory::NAMES,
            HistoryFeatures::Source(_) => &SourceHistory::NAMES,
        }
    }
}

/// Streak and tenure features
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialFeatures {
    /// Consecutive negative ratings received, most recent first
    pub successive_neg_rating: usize,
    /// Whole days since the user's first visible activity
    pub days_active: i64,
}

impl SequentialFeatures {
    pub const NAMES: [&'static str; 2] = ["successive_neg_rating", "days_active"];

    pub fn values(&self) -> Vec<f64> {
        vec![self.successive_neg_rating as f64, self.days_active as f64]
    }
}

fn whole_days(cutoff: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (cutoff - at).num_days()
}

/// Computes point-in-time rating history features
#[derive(Debug, Clone, Copy)]
pub struct HistoricalProfileComputer<'a> {
    store: &'a RatingStore,
    streak_cap: usize,
}

impl<'a> HistoricalProfileComputer<'a> {
    pub fn new(store: &'a RatingStore) -> Self {
        Self {
            store,
            streak_cap: DEFAULT_STREAK_CAP,
        }
    }

    /// Set the cap on the negative ratings streak
    pub fn with_streak_cap(mut self, cap: usize) -> Self {
        self.streak_cap = cap;
        self
    }

    /// Profile of `user` on `role` as visible at `cutoff`.
    ///
    /// A user without matching history gets an all-zero profile. `Either`
    /// has no profile layout and is rejected.
    pub fn profile(&self, user: UserId, cutoff: DateTime<Utc>, role: Role) -> Result<HistoryFeatures> {
        match role {
            Role::Target => {
                let events = self.store.events_before(user, Role::Target, cutoff, Polarity::All);
                Ok(HistoryFeatures::Target(TargetHistory::from_events(&events, cutoff)))
            }
            Role::Source => {
                let events = self.store.events_before(user, Role::Source, cutoff, Polarity::All);
                Ok(HistoryFeatures::Source(SourceHistory::from_events(&events, cutoff)))
            }
            Role::Either => Err(FeatureError::Configuration(
                "historical profile needs a target or source role".to_string(),
            )),
        }
    }

    /// Received-ratings profile
    pub fn target(&self, user: UserId, cutoff: DateTime<Utc>) -> TargetHistory {
        let events = self.store.events_before(user, Role::Target, cutoff, Polarity::All);
        TargetHistory::from_events(&events, cutoff)
    }

    /// Given-ratings profile
    pub fn source(&self, user: UserId, cutoff: DateTime<Utc>) -> SourceHistory {
        let events = self.store.events_before(user, Role::Source, cutoff, Polarity::All);
        SourceHistory::from_events(&events, cutoff)
    }

    /// Negative streak and tenure of `user` at `cutoff`
    pub fn sequential(&self, user: UserId, cutoff: DateTime<Utc>) -> SequentialFeatures {
        let received = self.store.events_before(user, Role::Target, cutoff, Polarity::All);
        let streak = received
            .iter()
            .rev()
            .take_while(|e| e.is_negative())
            .count()
            .min(self.streak_cap);

        let days_active = self
            .store
            .first_activity(user, cutoff)
            .map(|e| whole_days(cutoff, e.timestamp))
            .unwrap_or(0);

        SequentialFeatures {
            successive_neg_rating: streak,
            days_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 9, 1, 6, 30, 0).unwrap() + Duration::days(days)
    }

    #[test]
    fn test_target_profile_example() {
        let store = RatingStore::from_events(vec![
            RatingEvent::new(1, 2, 5, t(0)),
            RatingEvent::new(1, 2, -3, t(4)),
            RatingEvent::new(1, 2, -2, t(10)),
        ]);
        let computer = HistoricalProfileComputer::new(&store);

        let profile = computer.profile(2, t(10), Role::Target).unwrap();
        let HistoryFeatures::Target(h) = profile else {
            panic!("expected target profile");
        };
        assert_eq!(h.num_ratings_received, 2);
        assert_eq!(h.num_neg_received, 1);
        assert_eq!(h.num_pos_received, 1);
        assert!((h.neg_ratings_pct - 0.5).abs() < 1e-12);
        assert_eq!(h.rating_received_sum, 2);
        assert!((h.rating_received_avg - 1.0).abs() < 1e-12);
        assert_eq!(h.days_since_first_rating_target, 10);
        assert_eq!(h.days_since_last_rating_target, 6);
        assert!(h.last_rating_neg);
        assert_eq!(profile.values().len(), 9);
    }

    #[test]
    fn test_empty_history_is_zero() {
        let store = RatingStore::from_events(vec![RatingEvent::new(1, 2, 5, t(3))]);
        let computer = HistoricalProfileComputer::new(&store);

        let target = computer.profile(2, t(3), Role::Target).unwrap();
        assert_eq!(target.values(), vec![0.0; 9]);

        let source = computer.profile(2, t(30), Role::Source).unwrap();
        assert_eq!(source.values(), vec![0.0; 4]);
    }

    #[test]
    fn test_source_profile() {
        let store = RatingStore::from_events(vec![
            RatingEvent::new(7, 1, 4, t(0)),
            RatingEvent::new(7, 2, -1, t(2)),
            RatingEvent::new(3, 7, 1, t(3)),
        ]);
        let h = HistoricalProfileComputer::new(&store).source(7, t(5));
        assert_eq!(h.num_ratings_given, 2);
        assert!((h.rating_given_avg - 1.5).abs() < 1e-12);
        assert_eq!(h.days_since_first_rating_source, 5);
        assert_eq!(h.days_since_last_rating_source, 3);
    }

    #[test]
    fn test_either_role_is_rejected() {
        let store = RatingStore::default();
        let result = HistoricalProfileComputer::new(&store).profile(1, t(0), Role::Either);
        assert!(matches!(result, Err(FeatureError::Configuration(_))));
    }

    #[test]
    fn test_streak_is_capped() {
        let mut events = vec![RatingEvent::new(9, 2, 3, t(0))];
        for day in 1..=5 {
            events.push(RatingEvent::new(day, 2, -1, t(day)));
        }
        let store = RatingStore::from_events(events);
        let computer = HistoricalProfileComputer::new(&store);

        let seq = computer.sequential(2, t(6));
        assert_eq!(seq.successive_neg_rating, 3);
        assert_eq!(seq.days_active, 6);

        let uncapped = computer.with_streak_cap(10).sequential(2, t(6));
        assert_eq!(uncapped.successive_neg_rating, 5);
    }

    #[test]
    fn test_streak_broken_by_positive() {
        let store = RatingStore::from_events(vec![
            RatingEvent::new(1, 2, -4, t(0)),
            RatingEvent::new(3, 2, 2, t(1)),
            RatingEvent::new(4, 2, -1, t(2)),
        ]);
        let seq = HistoricalProfileComputer::new(&store).sequential(2, t(3));
        assert_eq!(seq.successive_neg_rating, 1);
    }
}

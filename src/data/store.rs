//! In-memory, time-ordered rating history.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::info;

use super::loader::RatingRecord;
use super::types::{Polarity, RatingEvent, Role, UserId, WindowCount};
use super::view::{TemporalView, VisibilityPolicy};
use crate::error::Result;

/// Ordered collection of rating events with per-user indexes.
///
/// Events are sorted ascending by timestamp, ties kept in input order.
/// The store is read-only after construction and can be shared across
/// threads freely.
#[derive(Debug, Clone, Default)]
pub struct RatingStore {
    events: Vec<RatingEvent>,
    /// Positions of events given by each user
    by_rater: HashMap<UserId, Vec<usize>>,
    /// Positions of events received by each user
    by_ratee: HashMap<UserId, Vec<usize>>,
    /// Positions of events touching each user on either side
    by_user: HashMap<UserId, Vec<usize>>,
    policy: VisibilityPolicy,
}

impl RatingStore {
    /// Build a store from typed events
    pub fn from_events(mut events: Vec<RatingEvent>) -> Self {
        // stable: equal timestamps keep arrival order
        events.sort_by_key(|e| e.timestamp);

        let mut by_rater: HashMap<UserId, Vec<usize>> = HashMap::new();
        let mut by_ratee: HashMap<UserId, Vec<usize>> = HashMap::new();
        let mut by_user: HashMap<UserId, Vec<usize>> = HashMap::new();

        for (idx, event) in events.iter().enumerate() {
            by_rater.entry(event.rater).or_default().push(idx);
            by_ratee.entry(event.ratee).or_default().push(idx);
            by_user.entry(event.rater).or_default().push(idx);
            if event.ratee != event.rater {
                by_user.entry(event.ratee).or_default().push(idx);
            }
        }

        Self {
            events,
            by_rater,
            by_ratee,
            by_user,
            policy: VisibilityPolicy::default(),
        }
    }

    /// Parse and load raw records, failing on the first malformed one
    pub fn load<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = RatingRecord>,
    {
        let events = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| record.parse(i + 1))
            .collect::<Result<Vec<_>>>()?;

        let store = Self::from_events(events);
        info!(
            "Loaded {} ratings between {} users",
            store.len(),
            store.user_count()
        );
        Ok(store)
    }

    /// Set the visibility policy used by every query
    pub fn with_policy(mut self, policy: VisibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Visibility policy in effect
    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    /// All events in timestamp order
    pub fn events(&self) -> &[RatingEvent] {
        &self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of distinct users on either side of any rating
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// View of the history at `cutoff` under this store's policy
    pub fn view(&self, cutoff: DateTime<Utc>, polarity: Polarity) -> TemporalView {
        TemporalView::new(cutoff, self.policy, polarity)
    }

    fn positions(&self, user: UserId, role: Role) -> &[usize] {
        let index = match role {
            Role::Target => &self.by_ratee,
            Role::Source => &self.by_rater,
            Role::Either => &self.by_user,
        };
        index.get(&user).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Events of `user` on `role` visible at `cutoff`, in timestamp order
    pub fn events_before(
        &self,
        user: UserId,
        role: Role,
        cutoff: DateTime<Utc>,
        polarity: Polarity,
    ) -> Vec<&RatingEvent> {
        let view = self.view(cutoff, polarity);
        let positions = self.positions(user, role);
        let horizon = view.horizon();
        let end = positions.partition_point(|&i| self.events[i].timestamp <= horizon);

        positions[..end]
            .iter()
            .map(|&i| &self.events[i])
            .filter(|e| view.admits(e))
            .collect()
    }

    /// Count events of `user` on `role` with `start < timestamp < end`
    pub fn events_in_window(
        &self,
        user: UserId,
        role: Role,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> WindowCount {
        let positions = self.positions(user, role);
        let lo = positions.partition_point(|&i| self.events[i].timestamp <= start);
        let hi = positions.partition_point(|&i| self.events[i].timestamp < end);

        let mut count = WindowCount::default();
        if lo < hi {
            for &i in &positions[lo..hi] {
                count.add(&self.events[i]);
            }
        }
        count
    }

    /// All events visible at `cutoff`, optionally only those touching `users`
    pub fn visible_events(
        &self,
        cutoff: DateTime<Utc>,
        polarity: Polarity,
        users: Option<&HashSet<UserId>>,
    ) -> Vec<&RatingEvent> {
        let view = self.view(cutoff, polarity);
        let horizon = view.horizon();
        let end = self.events.partition_point(|e| e.timestamp <= horizon);

        self.events[..end]
            .iter()
            .filter(|e| view.admits(e))
            .filter(|e| match users {
                Some(set) => set.contains(&e.rater) || set.contains(&e.ratee),
                None => true,
            })
            .collect()
    }

    /// Earliest visible rating the user gave or received
    pub fn first_activity(&self, user: UserId, cutoff: DateTime<Utc>) -> Option<&RatingEvent> {
        let view = self.view(cutoff, Polarity::All);
        self.positions(user, Role::Either)
            .iter()
            .map(|&i| &self.events[i])
            .take_while(|e| e.timestamp <= view.horizon())
            .find(|e| view.admits(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 2, 10, 8, 0, 0).unwrap()
    }

    fn sample_store() -> RatingStore {
        RatingStore::from_events(vec![
            RatingEvent::new(1, 2, 5, t0() + Duration::minutes(20)),
            RatingEvent::new(3, 2, -2, t0()),
            RatingEvent::new(2, 4, 1, t0() + Duration::minutes(10)),
            RatingEvent::new(1, 2, -4, t0() + Duration::minutes(20)),
        ])
    }

    #[test]
    fn test_sorted_with_stable_ties() {
        let store = sample_store();
        let ratings: Vec<_> = store.events().iter().map(|e| e.rating).collect();
        assert_eq!(ratings, vec![-2, 1, 5, -4]);
        assert_eq!(store.user_count(), 4);
    }

    #[test]
    fn test_events_before_strict() {
        let store = sample_store();
        let cutoff = t0() + Duration::minutes(20);

        let received = store.events_before(2, Role::Target, cutoff, Polarity::All);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].rating, -2);

        let either = store.events_before(2, Role::Either, cutoff, Polarity::All);
        assert_eq!(either.len(), 2);

        let given = store.events_before(2, Role::Source, cutoff, Polarity::Negative);
        assert!(given.is_empty());
    }

    #[test]
    fn test_events_before_tie_break() {
        let store = sample_store().with_policy(VisibilityPolicy::SameTimestampPositive);
        let cutoff = t0() + Duration::minutes(20);

        let received = store.events_before(2, Role::Target, cutoff, Polarity::All);
        let ratings: Vec<_> = received.iter().map(|e| e.rating).collect();
        assert_eq!(ratings, vec![-2, 5]);
    }

    #[test]
    fn test_same_day_policy_admits_later_positive_ratings() {
        let store = RatingStore::from_events(vec![
            RatingEvent::new(5, 6, -1, t0() - Duration::days(1)),
            RatingEvent::new(7, 6, 3, t0()),
            RatingEvent::new(8, 6, 2, t0() + Duration::hours(9)),
            RatingEvent::new(9, 6, -6, t0() + Duration::hours(10)),
            RatingEvent::new(4, 6, 4, t0() + Duration::hours(16)),
        ])
        .with_policy(VisibilityPolicy::SameDayPositive);

        // positive later that day is visible, negative later that day and next-day ratings are not
        let received = store.events_before(6, Role::Target, t0(), Polarity::All);
        let ratings: Vec<_> = received.iter().map(|e| e.rating).collect();
        assert_eq!(ratings, vec![-1, 3, 2]);

        let positive = store.events_before(6, Role::Target, t0(), Polarity::Positive);
        assert_eq!(positive.len(), 2);

        // user 8 only rates later the same day
        assert_eq!(store.first_activity(8, t0()).map(|e| e.rating), Some(2));
        assert!(store.first_activity(9, t0()).is_none());
        assert!(store.first_activity(4, t0()).is_none());

        let strict = store.clone().with_policy(VisibilityPolicy::Strict);
        assert!(strict.first_activity(8, t0()).is_none());
        assert_eq!(strict.events_before(6, Role::Target, t0(), Polarity::All).len(), 1);
    }

    #[test]
    fn test_events_in_window_is_open() {
        let store = sample_store();
        let count = store.events_in_window(
            2,
            Role::Either,
            t0(),
            t0() + Duration::minutes(20),
        );
        // t0 sits on the start bound, the two ratings at +20m on the end bound
        assert_eq!(count.total, 1);
        assert_eq!(count.positive, 1);
    }

    #[test]
    fn test_visible_events_with_subset() {
        let store = sample_store();
        let subset: HashSet<UserId> = [4].into_iter().collect();
        let cutoff = t0() + Duration::hours(1);

        assert_eq!(store.visible_events(cutoff, Polarity::All, None).len(), 4);
        assert_eq!(store.visible_events(cutoff, Polarity::Positive, None).len(), 2);
        assert_eq!(store.visible_events(cutoff, Polarity::All, Some(&subset)).len(), 1);
    }

    #[test]
    fn test_first_activity() {
        let store = sample_store();
        let cutoff = t0() + Duration::hours(1);
        assert_eq!(store.first_activity(1, cutoff).map(|e| e.rating), Some(5));
        assert!(store.first_activity(1, t0()).is_none());
        assert!(store.first_activity(99, cutoff).is_none());
    }
}

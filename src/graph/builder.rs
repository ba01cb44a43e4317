//! Point-in-time trust graph construction.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::TrustGraph;
use crate::data::{Polarity, RatingStore, UserId};

/// Builds the trust graph as it looked at a given instant
#[derive(Debug, Clone, Copy)]
pub struct TemporalGraphBuilder<'a> {
    store: &'a RatingStore,
}

impl<'a> TemporalGraphBuilder<'a> {
    /// Create a builder over a rating store
    pub fn new(store: &'a RatingStore) -> Self {
        Self { store }
    }

    /// Build the graph of ratings visible at `cutoff` with the given
    /// polarity, optionally only ratings touching `users`.
    ///
    /// Ratings are applied in timestamp order, so the edge kept for a
    /// repeated rater -> ratee pair is the latest one. Self-ratings add the
    /// user as a node but no edge.
    pub fn build(
        &self,
        cutoff: DateTime<Utc>,
        polarity: Polarity,
        users: Option<&HashSet<UserId>>,
    ) -> TrustGraph {
        let mut graph = TrustGraph::new();
        let mut self_ratings = 0usize;

        for event in self.store.visible_events(cutoff, polarity, users) {
            if event.rater == event.ratee {
                graph.add_user(event.rater);
                self_ratings += 1;
                continue;
            }
            graph.add_rating(event);
        }

        if self_ratings > 0 {
            debug!("Skipped {} self-ratings before {}", self_ratings, cutoff);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RatingEvent, VisibilityPolicy};
    use chrono::{Duration, TimeZone};

    fn t(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 1, 1, 0, 0, 0).unwrap() + Duration::days(days)
    }

    fn store() -> RatingStore {
        RatingStore::from_events(vec![
            RatingEvent::new(1, 2, 4, t(0)),
            RatingEvent::new(3, 2, -5, t(1)),
            RatingEvent::new(1, 2, -1, t(2)),
            RatingEvent::new(2, 4, 2, t(3)),
            RatingEvent::new(5, 5, 1, t(3)),
        ])
    }

    #[test]
    fn test_build_respects_cutoff_and_polarity() {
        let store = store();
        let builder = TemporalGraphBuilder::new(&store);

        let positive = builder.build(t(3), Polarity::Positive, None);
        assert_eq!(positive.node_count(), 2);
        assert_eq!(positive.edge_count(), 1);

        let all = builder.build(t(3), Polarity::All, None);
        assert_eq!(all.node_count(), 3);
        assert_eq!(all.edge(1, 2).map(|e| e.rating), Some(-1));

        assert_eq!(builder.build(t(0), Polarity::All, None).node_count(), 0);
    }

    #[test]
    fn test_build_with_user_subset() {
        let store = store();
        let builder = TemporalGraphBuilder::new(&store);
        let users: HashSet<UserId> = [4].into_iter().collect();

        let graph = builder.build(t(10), Polarity::All, Some(&users));
        assert_eq!(graph.node_count(), 2);
        assert!(graph.edge(2, 4).is_some());
    }

    #[test]
    fn test_self_rating_adds_node_only() {
        let store = store();
        let graph = TemporalGraphBuilder::new(&store).build(t(10), Polarity::All, None);
        assert!(graph.contains(5));
        assert!(graph.edge(5, 5).is_none());
    }

    #[test]
    fn test_same_timestamp_positive_is_visible() {
        let store = store().with_policy(VisibilityPolicy::SameTimestampPositive);
        let graph = TemporalGraphBuilder::new(&store).build(t(3), Polarity::All, None);
        assert!(graph.edge(2, 4).is_some());
    }
}

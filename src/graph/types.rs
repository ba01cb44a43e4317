//! Directed trust graph types.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{IntoNeighbors, Reversed};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::data::{RatingEvent, UserId, WeightClass};

/// Attributes carried by a rater -> ratee edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustEdge {
    /// Signed rating value
    pub rating: i32,
    /// Magnitude bucket
    pub weight_class: WeightClass,
    /// Whether the rating was negative
    pub negative: bool,
    /// When the rating was left
    pub timestamp: DateTime<Utc>,
}

impl From<&RatingEvent> for TrustEdge {
    fn from(event: &RatingEvent) -> Self {
        Self {
            rating: event.rating,
            weight_class: event.weight_class(),
            negative: event.is_negative(),
            timestamp: event.timestamp,
        }
    }
}

/// Directed graph of who rated whom.
///
/// At most one edge per ordered pair; adding a rating for an existing pair
/// replaces the edge attributes.
#[derive(Debug, Clone, Default)]
pub struct TrustGraph {
    /// Underlying petgraph structure
    pub graph: DiGraph<UserId, TrustEdge>,
    /// User id to node index mapping
    pub user_index: HashMap<UserId, NodeIndex>,
}

impl TrustGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing petgraph graph, rebuilding the user index
    pub fn from_graph(graph: DiGraph<UserId, TrustEdge>) -> Self {
        let user_index = graph
            .node_indices()
            .map(|idx| (graph[idx], idx))
            .collect();
        Self { graph, user_index }
    }

    /// Add a user node if missing
    pub fn add_user(&mut self, user: UserId) -> NodeIndex {
        if let Some(&idx) = self.user_index.get(&user) {
            return idx;
        }
        let idx = self.graph.add_node(user);
        self.user_index.insert(user, idx);
        idx
    }

    /// Add a rating as a rater -> ratee edge, overwriting any earlier one
    pub fn add_rating(&mut self, event: &RatingEvent) {
        let from = self.add_user(event.rater);
        let to = self.add_user(event.ratee);
        self.graph.update_edge(from, to, TrustEdge::from(event));
    }

    /// Node index of a user
    pub fn node_index(&self, user: UserId) -> Option<NodeIndex> {
        self.user_index.get(&user).copied()
    }

    /// Check if the user is in the graph
    pub fn contains(&self, user: UserId) -> bool {
        self.user_index.contains_key(&user)
    }

    /// Number of users
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct rater -> ratee pairs
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Attributes of the edge `from -> to`
    pub fn edge(&self, from: UserId, to: UserId) -> Option<&TrustEdge> {
        let a = self.node_index(from)?;
        let b = self.node_index(to)?;
        let edge = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(edge)
    }

    /// Users who rated `user`
    pub fn raters(&self, user: UserId) -> Vec<UserId> {
        self.neighbors(user, Direction::Incoming)
    }

    /// Users rated by `user`
    pub fn ratees(&self, user: UserId) -> Vec<UserId> {
        self.neighbors(user, Direction::Outgoing)
    }

    fn neighbors(&self, user: UserId, dir: Direction) -> Vec<UserId> {
        self.node_index(user)
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, dir)
                    .map(|n| self.graph[n])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Radius-1 ego graph over incoming edges: `user` plus everyone who
    /// rated it, with all edges among them in their original direction.
    ///
    /// The frontier is found on the reversed graph (so raters become
    /// out-neighbors), the subgraph is then induced on the original one.
    pub fn raters_ego_graph(&self, user: UserId) -> Option<TrustGraph> {
        let center = self.node_index(user)?;

        let mut members: HashSet<NodeIndex> = Reversed(&self.graph).neighbors(center).collect();
        members.insert(center);

        let induced = self.graph.filter_map(
            |idx, &id| members.contains(&idx).then_some(id),
            |_, &edge| Some(edge),
        );
        Some(TrustGraph::from_graph(induced))
    }
}

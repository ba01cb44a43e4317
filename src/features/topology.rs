//! Ego-graph topology features.
//!
//! The ego graph of a user is the user plus everyone who rated it, with all
//! ratings among them kept in their original direction. Structure inside
//! that neighborhood (reciprocated trust, closed triads, cliques) is a
//! strong signal for rings of accounts vouching for each other.

use serde::{Deserialize, Serialize};

use crate::data::{Role, UserId};
use crate::graph::{CensusBuckets, GraphMetrics, TriadicCensus, TrustGraph};

/// Census bucket columns, in output order
pub const CENSUS_FIELDS: [&str; 10] = [
    "triad_300",
    "triad_210",
    "triad_120",
    "triad_030t",
    "triad_030c",
    "triad_201",
    "triad_111",
    "triad_102",
    "triad_021",
    "triad_all",
];

const CENTRALITY_FIELDS: [&str; 4] = ["cluster_coef", "neighbors_in", "betweenness", "excess_ratings_in"];

const CLIQUE_FIELDS: [&str; 5] = ["cluster_coef", "degree", "betweenness", "closeness", "num_cliques"];

/// Which metric set accompanies the triadic census
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerMode {
    /// Census, clustering, in-degree, betweenness, excess ratings in
    #[default]
    CensusCentrality,
    /// Census, clustering, degree, betweenness, closeness, clique count
    CensusCliques,
}

impl AnalyzerMode {
    /// Number of fields produced
    pub fn arity(&self) -> usize {
        CENSUS_FIELDS.len() + self.metric_fields().len()
    }

    fn metric_fields(&self) -> &'static [&'static str] {
        match self {
            AnalyzerMode::CensusCentrality => &CENTRALITY_FIELDS,
            AnalyzerMode::CensusCliques => &CLIQUE_FIELDS,
        }
    }

    /// Unsuffixed field names in output order
    pub fn field_names(&self) -> Vec<&'static str> {
        CENSUS_FIELDS
            .iter()
            .chain(self.metric_fields())
            .copied()
            .collect()
    }
}

/// Topology of one user's raters ego graph.
///
/// Holds the union of both modes' metrics; [`TopologyFeatures::values`]
/// selects the ones a mode emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyFeatures {
    pub census: CensusBuckets,
    /// Directed local clustering coefficient
    pub cluster_coef: f64,
    /// Distinct raters of the user
    pub neighbors_in: f64,
    /// In-degree plus out-degree within the ego graph
    pub degree: f64,
    /// Normalized betweenness centrality
    pub betweenness: f64,
    /// In-degree centrality minus out-degree centrality
    pub excess_ratings_in: f64,
    /// Closeness centrality over incoming distances
    pub closeness: f64,
    /// Maximal cliques containing the user (undirected)
    pub num_cliques: f64,
}

impl TopologyFeatures {
    /// Feature values in the order of [`AnalyzerMode::field_names`]
    pub fn values(&self, mode: AnalyzerMode) -> Vec<f64> {
        let c = &self.census;
        let mut values: Vec<f64> = [
            c.triad_300,
            c.triad_210,
            c.triad_120,
            c.triad_030t,
            c.triad_030c,
            c.triad_201,
            c.triad_111,
            c.triad_102,
            c.triad_021,
            c.triad_all,
        ]
        .iter()
        .map(|&n| n as f64)
        .collect();

        match mode {
            AnalyzerMode::CensusCentrality => values.extend([
                self.cluster_coef,
                self.neighbors_in,
                self.betweenness,
                self.excess_ratings_in,
            ]),
            AnalyzerMode::CensusCliques => values.extend([
                self.cluster_coef,
                self.degree,
                self.betweenness,
                self.closeness,
                self.num_cliques,
            ]),
        }
        values
    }

    /// Column names with the role suffix, e.g. `triad_300_target`
    pub fn names(mode: AnalyzerMode, role: Role) -> Vec<String> {
        mode.field_names()
            .into_iter()
            .map(|name| format!("{}_{}", name, role.suffix()))
            .collect()
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Computes [`TopologyFeatures`] for a user on a trust graph snapshot
#[derive(Debug, Clone, Copy)]
pub struct EgoGraphAnalyzer {
    mode: AnalyzerMode,
    min_ego_nodes: usize,
}

impl Default for EgoGraphAnalyzer {
    fn default() -> Self {
        Self {
            mode: AnalyzerMode::default(),
            min_ego_nodes: 4,
        }
    }
}

impl EgoGraphAnalyzer {
    /// Create an analyzer
    pub fn new(mode: AnalyzerMode, min_ego_nodes: usize) -> Self {
        Self { mode, min_ego_nodes }
    }

    /// Metric set in use
    pub fn mode(&self) -> AnalyzerMode {
        self.mode
    }

    /// Ego graphs smaller than this yield all-zero features
    pub fn min_ego_nodes(&self) -> usize {
        self.min_ego_nodes
    }

    /// Analyze the raters ego graph of `user`.
    ///
    /// An absent user or an ego graph below the size threshold yields
    /// all-zero features.
    pub fn analyze(&self, graph: &TrustGraph, user: UserId) -> TopologyFeatures {
        let Some(ego) = graph.raters_ego_graph(user) else {
            return TopologyFeatures::default();
        };
        if ego.node_count() < self.min_ego_nodes {
            return TopologyFeatures::default();
        }

        let census = TriadicCensus::compute(&ego).buckets();
        let metrics = GraphMetrics::new(&ego);

        let mut features = TopologyFeatures {
            census,
            cluster_coef: finite(metrics.clustering(user)),
            neighbors_in: metrics.in_degree(user) as f64,
            degree: metrics.degree(user) as f64,
            betweenness: finite(metrics.betweenness(user)),
            ..TopologyFeatures::default()
        };

        match self.mode {
            AnalyzerMode::CensusCentrality => {
                features.excess_ratings_in =
                    finite(metrics.in_degree_centrality(user) - metrics.out_degree_centrality(user));
            }
            AnalyzerMode::CensusCliques => {
                features.closeness = finite(metrics.closeness(user));
                features.num_cliques = metrics.cliques_containing(user) as f64;
            }
        }
        features
    }

    /// Analyze and flatten to the mode's value vector
    pub fn analyze_values(&self, graph: &TrustGraph, user: UserId) -> Vec<f64> {
        self.analyze(graph, user).values(self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RatingEvent;
    use crate::graph::TriadType;
    use chrono::{Duration, TimeZone, Utc};

    fn graph_from(edges: &[(i64, i64)]) -> TrustGraph {
        let start = Utc.with_ymd_and_hms(2014, 7, 1, 0, 0, 0).unwrap();
        let mut graph = TrustGraph::new();
        for (i, &(a, b)) in edges.iter().enumerate() {
            graph.add_rating(&RatingEvent::new(a, b, 3, start + Duration::hours(i as i64)));
        }
        graph
    }

    fn ring_graph() -> TrustGraph {
        // 2, 3, 4 rate 1 and each other in a cycle; 1 rates 2 back; 9 is outside
        graph_from(&[(2, 1), (3, 1), (4, 1), (2, 3), (3, 4), (4, 2), (1, 2), (9, 2)])
    }

    #[test]
    fn test_arity() {
        assert_eq!(AnalyzerMode::CensusCentrality.arity(), 14);
        assert_eq!(AnalyzerMode::CensusCliques.arity(), 15);

        let names = TopologyFeatures::names(AnalyzerMode::CensusCentrality, Role::Target);
        assert_eq!(names[0], "triad_300_target");
        assert_eq!(names[12], "betweenness_target");
    }

    #[test]
    fn test_absent_user_is_zero() {
        let analyzer = EgoGraphAnalyzer::default();
        let values = analyzer.analyze_values(&ring_graph(), 42);
        assert_eq!(values, vec![0.0; 14]);
    }

    #[test]
    fn test_small_ego_graph_is_zero() {
        let graph = graph_from(&[(2, 1), (3, 1), (2, 3)]);
        let analyzer = EgoGraphAnalyzer::new(AnalyzerMode::CensusCliques, 4);
        assert_eq!(analyzer.analyze_values(&graph, 1), vec![0.0; 15]);

        let permissive = EgoGraphAnalyzer::new(AnalyzerMode::CensusCliques, 3);
        assert_eq!(permissive.analyze(&graph, 1).census.triad_all, 1);
    }

    #[test]
    fn test_census_covers_all_triples() {
        let graph = ring_graph();
        let ego = graph.raters_ego_graph(1).unwrap();
        assert_eq!(ego.node_count(), 4);

        let census = TriadicCensus::compute(&ego);
        assert_eq!(census.total(), 4);
        assert_eq!(census.count(TriadType::T003), 0);

        let features = EgoGraphAnalyzer::default().analyze(&graph, 1);
        assert_eq!(features.census.triad_all, 4);
        assert_eq!(features.neighbors_in, 3.0);
    }

    #[test]
    fn test_centrality_mode_metrics() {
        let features = EgoGraphAnalyzer::default().analyze(&ring_graph(), 1);
        // in-degree 3 of 3, out-degree 1 of 3
        assert!((features.excess_ratings_in - 2.0 / 3.0).abs() < 1e-10);
        assert!(features.cluster_coef > 0.0 && features.cluster_coef <= 1.0);
        assert_eq!(features.num_cliques, 0.0);
    }

    #[test]
    fn test_cliques_mode_metrics() {
        let analyzer = EgoGraphAnalyzer::new(AnalyzerMode::CensusCliques, 4);
        let features = analyzer.analyze(&ring_graph(), 1);
        // the undirected projection of the ego graph is complete on 4 nodes
        assert_eq!(features.num_cliques, 1.0);
        assert_eq!(features.degree, 4.0);
        assert!((features.closeness - 1.0).abs() < 1e-10);
    }
}

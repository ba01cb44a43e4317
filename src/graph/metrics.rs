//! Centrality, clustering and clique measures on a trust graph.

use std::collections::{BTreeSet, VecDeque};

use petgraph::Direction;

use super::TrustGraph;
use crate::data::UserId;

/// Graph metrics calculator.
///
/// Self-ratings are ignored by every measure. Adjacency is kept ordered so
/// floating-point accumulation is reproducible run to run.
#[derive(Debug)]
pub struct GraphMetrics<'a> {
    graph: &'a TrustGraph,
    succ: Vec<BTreeSet<usize>>,
    pred: Vec<BTreeSet<usize>>,
}

impl<'a> GraphMetrics<'a> {
    /// Create a new metrics calculator for a graph
    pub fn new(graph: &'a TrustGraph) -> Self {
        let n = graph.node_count();
        let mut succ = vec![BTreeSet::new(); n];
        let mut pred = vec![BTreeSet::new(); n];

        for idx in graph.graph.node_indices() {
            for next in graph.graph.neighbors_directed(idx, Direction::Outgoing) {
                if next != idx {
                    succ[idx.index()].insert(next.index());
                    pred[next.index()].insert(idx.index());
                }
            }
        }

        Self { graph, succ, pred }
    }

    fn position(&self, user: UserId) -> Option<usize> {
        self.graph.node_index(user).map(|idx| idx.index())
    }

    fn node_count(&self) -> usize {
        self.succ.len()
    }

    /// Number of distinct users who rated `user`
    pub fn in_degree(&self, user: UserId) -> usize {
        self.position(user).map(|v| self.pred[v].len()).unwrap_or(0)
    }

    /// Number of distinct users `user` rated
    pub fn out_degree(&self, user: UserId) -> usize {
        self.position(user).map(|v| self.succ[v].len()).unwrap_or(0)
    }

    /// In-degree plus out-degree
    pub fn degree(&self, user: UserId) -> usize {
        self.in_degree(user) + self.out_degree(user)
    }

    /// In-degree centrality = in-degree / (n - 1)
    pub fn in_degree_centrality(&self, user: UserId) -> f64 {
        let n = self.node_count();
        if n <= 1 {
            return 0.0;
        }
        self.in_degree(user) as f64 / (n - 1) as f64
    }

    /// Out-degree centrality = out-degree / (n - 1)
    pub fn out_degree_centrality(&self, user: UserId) -> f64 {
        let n = self.node_count();
        if n <= 1 {
            return 0.0;
        }
        self.out_degree(user) as f64 / (n - 1) as f64
    }

    /// Directed local clustering coefficient (Fagiolo).
    ///
    /// `T / (2 * (d_tot * (d_tot - 1) - 2 * d_recip))` where `T` counts
    /// directed triangles through the node, `d_tot` is in + out degree and
    /// `d_recip` the number of reciprocated ties.
    pub fn clustering(&self, user: UserId) -> f64 {
        let Some(v) = self.position(user) else {
            return 0.0;
        };
        let preds = &self.pred[v];
        let succs = &self.succ[v];

        let mut triangles = 0usize;
        for &j in preds.iter().chain(succs.iter()) {
            let jpreds = &self.pred[j];
            let jsuccs = &self.succ[j];
            triangles += preds.intersection(jpreds).count()
                + preds.intersection(jsuccs).count()
                + succs.intersection(jpreds).count()
                + succs.intersection(jsuccs).count();
        }
        if triangles == 0 {
            return 0.0;
        }

        let total = preds.len() + succs.len();
        let reciprocal = preds.intersection(succs).count();
        let possible = 2 * (total * (total - 1) - 2 * reciprocal);
        if possible == 0 {
            return 0.0;
        }
        triangles as f64 / possible as f64
    }

    /// Normalized betweenness centrality for all nodes, by node position.
    ///
    /// Brandes' algorithm over directed shortest paths, scaled by
    /// `1 / ((n - 1) * (n - 2))`.
    pub fn betweenness_centrality(&self) -> Vec<f64> {
        let n = self.node_count();
        let mut centrality = vec![0.0; n];

        for source in 0..n {
            let mut stack = Vec::with_capacity(n);
            let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut num_paths = vec![0.0_f64; n];
            let mut distance = vec![usize::MAX; n];
            num_paths[source] = 1.0;
            distance[source] = 0;

            let mut queue = VecDeque::new();
            queue.push_back(source);
            while let Some(current) = queue.pop_front() {
                stack.push(current);
                for &next in &self.succ[current] {
                    if distance[next] == usize::MAX {
                        distance[next] = distance[current] + 1;
                        queue.push_back(next);
                    }
                    if distance[next] == distance[current] + 1 {
                        num_paths[next] += num_paths[current];
                        predecessors[next].push(current);
                    }
                }
            }

            let mut dependency = vec![0.0; n];
            while let Some(node) = stack.pop() {
                for &pred in &predecessors[node] {
                    dependency[pred] += num_paths[pred] / num_paths[node] * (1.0 + dependency[node]);
                }
                if node != source {
                    centrality[node] += dependency[node];
                }
            }
        }

        if n > 2 {
            let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
            for value in &mut centrality {
                *value *= scale;
            }
        }
        centrality
    }

    /// Normalized betweenness centrality of one user
    pub fn betweenness(&self, user: UserId) -> f64 {
        self.position(user)
            .map(|v| self.betweenness_centrality()[v])
            .unwrap_or(0.0)
    }

    /// Closeness centrality over incoming distances.
    ///
    /// `(r - 1) / sum(d)` scaled by `(r - 1) / (n - 1)`, where `r` counts the
    /// nodes that can reach `user` (itself included).
    pub fn closeness(&self, user: UserId) -> f64 {
        let Some(v) = self.position(user) else {
            return 0.0;
        };
        let n = self.node_count();

        let mut distance = vec![usize::MAX; n];
        distance[v] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(v);
        while let Some(current) = queue.pop_front() {
            for &prev in &self.pred[current] {
                if distance[prev] == usize::MAX {
                    distance[prev] = distance[current] + 1;
                    queue.push_back(prev);
                }
            }
        }

        let reached: Vec<usize> = distance.into_iter().filter(|&d| d != usize::MAX).collect();
        let total: usize = reached.iter().sum();
        if total == 0 || n <= 1 {
            return 0.0;
        }

        let others = (reached.len() - 1) as f64;
        (others / total as f64) * (others / (n - 1) as f64)
    }

    /// Number of maximal cliques containing `user` in the undirected
    /// projection of the graph
    pub fn cliques_containing(&self, user: UserId) -> usize {
        let Some(v) = self.position(user) else {
            return 0;
        };
        let adjacency: Vec<BTreeSet<usize>> = (0..self.node_count())
            .map(|i| self.succ[i].union(&self.pred[i]).copied().collect())
            .collect();

        let candidates = adjacency[v].clone();
        let mut count = 0;
        bron_kerbosch(&adjacency, candidates, BTreeSet::new(), &mut count);
        count
    }
}

/// Bron-Kerbosch with pivoting; counts maximal cliques extending the
/// (implicit) current clique.
fn bron_kerbosch(
    adjacency: &[BTreeSet<usize>],
    mut candidates: BTreeSet<usize>,
    mut excluded: BTreeSet<usize>,
    count: &mut usize,
) {
    if candidates.is_empty() && excluded.is_empty() {
        *count += 1;
        return;
    }

    let pivot = candidates
        .union(&excluded)
        .max_by_key(|&&u| candidates.intersection(&adjacency[u]).count())
        .copied();

    let branch: Vec<usize> = match pivot {
        Some(u) => candidates.difference(&adjacency[u]).copied().collect(),
        None => candidates.iter().copied().collect(),
    };

    for v in branch {
        let neighbors = &adjacency[v];
        let next_candidates = candidates.intersection(neighbors).copied().collect();
        let next_excluded = excluded.intersection(neighbors).copied().collect();
        bron_kerbosch(adjacency, next_candidates, next_excluded, count);

        candidates.remove(&v);
        excluded.insert(v);
    }
}

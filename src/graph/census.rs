//! Triadic census of directed graphs.
//!
//! Every unordered triple of nodes falls into exactly one of 16 isomorphism
//! classes, named by the MAN convention: number of Mutual, Asymmetric and
//! Null dyads, plus a letter for the orientation (Up, Down, Cyclic,
//! Transitive) where needed.
//!
//! Connected triads are enumerated with the Batagelj-Mrvar scheme, the
//! dyadic ones (`012`, `102`) are counted per dyad and `003` is derived
//! from the total, so the work is proportional to the edges rather than to
//! all `C(n, 3)` triples.

use std::collections::HashSet;

use petgraph::Direction;
use serde::{Deserialize, Serialize};

use super::TrustGraph;

/// The 16 directed triad classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriadType {
    T003,
    T012,
    T102,
    T021D,
    T021U,
    T021C,
    T111D,
    T111U,
    T030T,
    T030C,
    T201,
    T120D,
    T120U,
    T120C,
    T210,
    T300,
}

/// Triad class (as position in [`TriadType::ALL`]) for each 6-bit tricode.
///
/// Bits for an ordered triple `(v, u, w)`: 1 `v->u`, 2 `u->v`, 4 `v->w`,
/// 8 `w->v`, 16 `u->w`, 32 `w->u`.
const TRICODES: [usize; 64] = [
    0, 1, 1, 2, 1, 3, 5, 7, 1, 5, 4, 6, 2, 7, 6, 10, //
    1, 5, 3, 7, 4, 8, 8, 12, 5, 9, 8, 13, 6, 13, 11, 14, //
    1, 4, 5, 6, 5, 8, 9, 13, 3, 8, 8, 11, 7, 12, 13, 14, //
    2, 6, 7, 10, 6, 11, 13, 14, 7, 13, 12, 14, 10, 14, 14, 15,
];

impl TriadType {
    /// All classes in canonical order
    pub const ALL: [TriadType; 16] = [
        TriadType::T003,
        TriadType::T012,
        TriadType::T102,
        TriadType::T021D,
        TriadType::T021U,
        TriadType::T021C,
        TriadType::T111D,
        TriadType::T111U,
        TriadType::T030T,
        TriadType::T030C,
        TriadType::T201,
        TriadType::T120D,
        TriadType::T120U,
        TriadType::T120C,
        TriadType::T210,
        TriadType::T300,
    ];

    /// MAN label, e.g. `"120U"`
    pub fn name(&self) -> &'static str {
        match self {
            TriadType::T003 => "003",
            TriadType::T012 => "012",
            TriadType::T102 => "102",
            TriadType::T021D => "021D",
            TriadType::T021U => "021U",
            TriadType::T021C => "021C",
            TriadType::T111D => "111D",
            TriadType::T111U => "111U",
            TriadType::T030T => "030T",
            TriadType::T030C => "030C",
            TriadType::T201 => "201",
            TriadType::T120D => "120D",
            TriadType::T120U => "120U",
            TriadType::T120C => "120C",
            TriadType::T210 => "210",
            TriadType::T300 => "300",
        }
    }

    fn position(&self) -> usize {
        *self as usize
    }

    fn from_tricode(code: usize) -> Self {
        Self::ALL[TRICODES[code]]
    }
}

/// Adjacency sets indexed by compact node position
struct Adjacency {
    succ: Vec<HashSet<usize>>,
    pred: Vec<HashSet<usize>>,
}

impl Adjacency {
    fn new(graph: &TrustGraph) -> Self {
        let n = graph.node_count();
        let mut succ = vec![HashSet::new(); n];
        let mut pred = vec![HashSet::new(); n];

        for idx in graph.graph.node_indices() {
            for next in graph.graph.neighbors_directed(idx, Direction::Outgoing) {
                if next != idx {
                    succ[idx.index()].insert(next.index());
                    pred[next.index()].insert(idx.index());
                }
            }
        }
        Self { succ, pred }
    }

    fn has_edge(&self, a: usize, b: usize) -> bool {
        self.succ[a].contains(&b)
    }

    fn tricode(&self, v: usize, u: usize, w: usize) -> usize {
        [(v, u, 1usize), (u, v, 2), (v, w, 4), (w, v, 8), (u, w, 16), (w, u, 32)]
            .iter()
            .filter(|(a, b, _)| self.has_edge(*a, *b))
            .map(|(_, _, bit)| bit)
            .sum()
    }
}

fn triples(n: usize) -> u64 {
    if n < 3 {
        return 0;
    }
    let n = n as u64;
    n * (n - 1) * (n - 2) / 6
}

/// Counts of every triad class in a graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriadicCensus {
    counts: [u64; 16],
}

impl TriadicCensus {
    /// Compute the census (Batagelj-Mrvar)
    pub fn compute(graph: &TrustGraph) -> Self {
        let n = graph.node_count();
        let adj = Adjacency::new(graph);
        let nbrs: Vec<HashSet<usize>> = (0..n)
            .map(|v| adj.succ[v].union(&adj.pred[v]).copied().collect())
            .collect();

        let mut counts = [0u64; 16];
        for v in 0..n {
            for &u in &nbrs[v] {
                if u <= v {
                    continue;
                }

                let mut neighbors: HashSet<usize> = nbrs[v].union(&nbrs[u]).copied().collect();
                neighbors.remove(&u);
                neighbors.remove(&v);

                let dyadic = (n - neighbors.len() - 2) as u64;
                if adj.has_edge(v, u) && adj.has_edge(u, v) {
                    counts[TriadType::T102.position()] += dyadic;
                } else {
                    counts[TriadType::T012.position()] += dyadic;
                }

                for &w in &neighbors {
                    // count each connected triad once, from its lowest dyad
                    if u < w || (v < w && w < u && !nbrs[v].contains(&w)) {
                        let triad = TriadType::from_tricode(adj.tricode(v, u, w));
                        counts[triad.position()] += 1;
                    }
                }
            }
        }

        let connected: u64 = counts.iter().sum();
        counts[TriadType::T003.position()] = triples(n) - connected;
        Self { counts }
    }

    /// Classify every triple individually. O(n^3); reference implementation.
    pub fn brute_force(graph: &TrustGraph) -> Self {
        let n = graph.node_count();
        let adj = Adjacency::new(graph);
        let mut counts = [0u64; 16];

        for v in 0..n {
            for u in (v + 1)..n {
                for w in (u + 1)..n {
                    let triad = TriadType::from_tricode(adj.tricode(v, u, w));
                    counts[triad.position()] += 1;
                }
            }
        }
        Self { counts }
    }

    /// Count for one class
    pub fn count(&self, triad: TriadType) -> u64 {
        self.counts[triad.position()]
    }

    /// Sum over all 16 classes
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterate `(class, count)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (TriadType, u64)> + '_ {
        TriadType::ALL.iter().map(move |&t| (t, self.count(t)))
    }

    /// Group the census into the fraud-signal buckets
    pub fn buckets(&self) -> CensusBuckets {
        use TriadType::*;
        CensusBuckets {
            triad_300: self.count(T300),
            triad_210: self.count(T210),
            triad_120: self.count(T120U) + self.count(T120D) + self.count(T120C),
            triad_030t: self.count(T030T),
            triad_030c: self.count(T030C),
            triad_201: self.count(T201),
            triad_111: self.count(T111U) + self.count(T111D),
            triad_102: self.count(T102),
            triad_021: self.count(T021U) + self.count(T021D) + self.count(T021C),
            triad_all: self.total(),
        }
    }
}

/// Census grouped by reciprocity.
///
/// Fully connected: `300`, `210`, `120*`, `030T`, `030C`.
/// Reciprocal but incomplete: `201`, `111*`, `102`.
/// Non-reciprocal: `021*`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusBuckets {
    pub triad_300: u64,
    pub triad_210: u64,
    pub triad_120: u64,
    pub triad_030t: u64,
    pub triad_030c: u64,
    pub triad_201: u64,
    pub triad_111: u64,
    pub triad_102: u64,
    pub triad_021: u64,
    pub triad_all: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RatingEvent;
    use chrono::{Duration, TimeZone, Utc};

    fn graph_from(edges: &[(i64, i64)]) -> TrustGraph {
        let start = Utc.with_ymd_and_hms(2015, 5, 1, 0, 0, 0).unwrap();
        let mut graph = TrustGraph::new();
        for (i, &(a, b)) in edges.iter().enumerate() {
            graph.add_rating(&RatingEvent::new(a, b, 1, start + Duration::seconds(i as i64)));
        }
        graph
    }

    #[test]
    fn test_single_triads() {
        let cases: Vec<(Vec<(i64, i64)>, TriadType)> = vec![
            (vec![(1, 2)], TriadType::T012),
            (vec![(1, 2), (2, 1)], TriadType::T102),
            (vec![(1, 2), (1, 3)], TriadType::T021D),
            (vec![(2, 1), (3, 1)], TriadType::T021U),
            (vec![(1, 2), (2, 3)], TriadType::T021C),
            (vec![(1, 2), (2, 1), (3, 2)], TriadType::T111D),
            (vec![(1, 2), (2, 1), (2, 3)], TriadType::T111U),
            (vec![(1, 2), (2, 3), (1, 3)], TriadType::T030T),
            (vec![(1, 2), (2, 3), (3, 1)], TriadType::T030C),
            (vec![(1, 2), (2, 1), (1, 3), (3, 1)], TriadType::T201),
            (vec![(1, 2), (2, 1), (3, 1), (3, 2)], TriadType::T120D),
            (vec![(1, 2), (2, 1), (1, 3), (2, 3)], TriadType::T120U),
            (vec![(1, 2), (2, 1), (1, 3), (3, 2)], TriadType::T120C),
            (vec![(1, 2), (2, 1), (1, 3), (3, 1), (2, 3)], TriadType::T210),
            (vec![(1, 2), (2, 1), (1, 3), (3, 1), (2, 3), (3, 2)], TriadType::T300),
        ];

        for (edges, expected) in cases {
            let mut graph = graph_from(&edges);
            graph.add_user(3);
            let census = TriadicCensus::compute(&graph);
            assert_eq!(census.total(), 1);
            assert_eq!(census.count(expected), 1, "edges {:?}", edges);
        }
    }

    #[test]
    fn test_empty_triad() {
        let mut graph = TrustGraph::new();
        for user in 1..=3 {
            graph.add_user(user);
        }
        assert_eq!(TriadicCensus::compute(&graph).count(TriadType::T003), 1);
    }

    #[test]
    fn test_matches_brute_force() {
        let graph = graph_from(&[
            (1, 2),
            (2, 1),
            (2, 3),
            (3, 4),
            (4, 2),
            (5, 1),
            (5, 3),
            (6, 5),
            (1, 6),
            (6, 1),
            (4, 7),
            (7, 3),
        ]);
        let fast = TriadicCensus::compute(&graph);
        let slow = TriadicCensus::brute_force(&graph);

        assert_eq!(fast, slow);
        assert_eq!(fast.total(), 35); // C(7, 3)
    }

    #[test]
    fn test_buckets_group_orientations() {
        // one 120U triad and one 021U triad sharing node 3
        let mut graph = graph_from(&[(1, 2), (2, 1), (1, 3), (2, 3), (4, 3)]);
        graph.add_user(5);
        let buckets = TriadicCensus::compute(&graph).buckets();

        assert_eq!(buckets.triad_120, 1);
        assert_eq!(buckets.triad_all, 10);
        assert_eq!(buckets.triad_021, 2);
        assert_eq!(buckets.triad_102, 1);
    }
}

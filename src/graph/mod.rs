//! Trust graph construction and analysis module.
//!
//! This module provides:
//! - The directed trust graph and its raters ego graph
//! - Point-in-time graph construction from the rating store
//! - Triadic census
//! - Centrality, clustering and clique measures

mod builder;
mod census;
mod metrics;
mod types;

pub use builder::TemporalGraphBuilder;
pub use census::{CensusBuckets, TriadType, TriadicCensus};
pub use metrics::GraphMetrics;
pub use types::{TrustEdge, TrustGraph};

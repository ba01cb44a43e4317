//! # Trust-Rating Fraud Features
//!
//! Point-in-time feature engineering for trust-rating marketplaces, where
//! users rate each other's trustworthiness on a signed integer scale.
//!
//! ## Overview
//!
//! For every rating, this library reconstructs the marketplace as it looked
//! at that rating's timestamp and computes:
//! - Rating history of the rated user (target) and the rating user (source)
//! - Topology of the target's "who rated me" ego graph in the positive
//!   trust graph: triadic census, clustering, centrality, cliques
//! - Short-window activity velocity and its running maximum
//!
//! Nothing at or after the rating's own timestamp leaks into its features
//! (under the default strict visibility policy).
//!
//! ## Example
//!
//! ```rust,no_run
//! use trust_rating_features::{
//!     data::{DataLoader, Role},
//!     features::{normalize_triads, FeatureRecordAssembler},
//!     utils::Config,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     // Load ratings
//!     let store = DataLoader::load_ratings("soc-sign-bitcoinotc.csv")?;
//!
//!     // Compute one feature row per rating
//!     let assembler = FeatureRecordAssembler::with_config(Config::default());
//!     let table = assembler.assemble_parallel(&store)?;
//!
//!     // Census counts per rater
//!     let table = normalize_triads(&table, Role::Target)?;
//!     DataLoader::save_features(&table, "features.csv")?;
//!
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod error;
pub mod features;
pub mod graph;
pub mod utils;

// Re-export main types for convenience
pub use data::{DataLoader, Polarity, RatingEvent, RatingStore, Role, UserId, VisibilityPolicy};
pub use error::{FeatureError, Result};
pub use features::{
    AnalyzerMode, EgoGraphAnalyzer, FeatureRecordAssembler, FeatureTable, HistoricalProfileComputer,
    VelocityCache, VelocityComputer,
};
pub use graph::{TemporalGraphBuilder, TriadicCensus, TrustGraph};
pub use utils::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::data::{
        DataLoader, Polarity, RatingEvent, RatingRecord, RatingStore, Role, UserId, VisibilityPolicy,
    };
    pub use crate::error::{FeatureError, Result};
    pub use crate::features::{
        normalize_triads, source_target_difference, AnalyzerMode, EgoGraphAnalyzer,
        FeatureRecordAssembler, FeatureTable, HistoricalProfileComputer, VelocityCache,
        VelocityComputer,
    };
    pub use crate::graph::{GraphMetrics, TemporalGraphBuilder, TriadicCensus, TrustGraph};
    pub use crate::utils::Config;
}

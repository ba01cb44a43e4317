//! Feature engineering module
//!
//! Point-in-time features computed for each rating:
//! - Rating history of the target and the source
//! - Ego-graph topology (triadic census, centrality, cliques)
//! - Activity velocity over short trailing windows
//! - Derived normalizations over an assembled table

mod assembler;
mod derived;
mod history;
mod topology;
mod velocity;

pub use assembler::{FeatureRecordAssembler, FeatureTable};
pub use derived::{normalize_triads, source_target_difference};
pub use history::{
    HistoricalProfileComputer, HistoryFeatures, SequentialFeatures, SourceHistory, TargetHistory,
    DEFAULT_STREAK_CAP,
};
pub use topology::{AnalyzerMode, EgoGraphAnalyzer, TopologyFeatures, CENSUS_FIELDS};
pub use velocity::{DirectionalVelocity, VelocityCache, VelocityComputer};

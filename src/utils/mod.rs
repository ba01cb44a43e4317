//! Utility module.

mod config;

pub use config::{Config, FeatureGroups, GraphConfig, HistoryConfig, VelocityConfig, MAX_WINDOW_HOURS};

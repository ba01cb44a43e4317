//! Configuration handling.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::{Polarity, VisibilityPolicy};
use crate::error::{FeatureError, Result};
use crate::features::AnalyzerMode;

/// Feature pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ego-graph analysis configuration
    pub graph: GraphConfig,
    /// Rating history configuration
    pub history: HistoryConfig,
    /// Velocity configuration
    pub velocity: VelocityConfig,
    /// Which ratings count as visible at an event's own timestamp
    pub visibility: VisibilityPolicy,
    /// Enabled feature groups
    pub groups: FeatureGroups,
}

/// Ego-graph analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Ego graphs with fewer nodes produce all-zero features
    pub min_ego_nodes: usize,
    /// Metric set computed next to the triadic census
    pub analyzer_mode: AnalyzerMode,
    /// Ratings used as trust edges
    pub graph_polarity: Polarity,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_ego_nodes: 4,
            analyzer_mode: AnalyzerMode::CensusCentrality,
            graph_polarity: Polarity::Positive,
        }
    }
}

/// Rating history configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Cap on the consecutive negative ratings streak
    pub streak_cap: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { streak_cap: 3 }
    }
}

/// Velocity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Trailing window for current velocity, in minutes
    pub window_minutes: i64,
    /// Trailing windows for directional velocity, in hours
    pub directional_windows_hours: Vec<i64>,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            window_minutes: 10,
            directional_windows_hours: vec![24, 48],
        }
    }
}

/// Longest accepted velocity window, in hours (ten years)
pub const MAX_WINDOW_HOURS: i64 = 10 * 366 * 24;

impl VelocityConfig {
    /// Current velocity window, clamped to [`MAX_WINDOW_HOURS`]
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.window_minutes.clamp(0, MAX_WINDOW_HOURS * 60))
    }
}

/// Feature groups emitted per event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureGroups {
    pub historical_target: bool,
    pub historical_source: bool,
    pub sequential: bool,
    pub graph_target: bool,
    pub graph_source: bool,
    pub velocity: bool,
    pub directional_velocity: bool,
}

impl Default for FeatureGroups {
    fn default() -> Self {
        Self::all()
    }
}

impl FeatureGroups {
    /// Every group enabled
    pub fn all() -> Self {
        Self {
            historical_target: true,
            historical_source: true,
            sequential: true,
            graph_target: true,
            graph_source: true,
            velocity: true,
            directional_velocity: true,
        }
    }

    /// Every group disabled
    pub fn none() -> Self {
        Self {
            historical_target: false,
            historical_source: false,
            sequential: false,
            graph_target: false,
            graph_source: false,
            velocity: false,
            directional_velocity: false,
        }
    }

    /// Check if at least one group is enabled
    pub fn any(&self) -> bool {
        self.historical_target
            || self.historical_source
            || self.sequential
            || self.graph_target
            || self.graph_source
            || self.velocity
            || self.directional_velocity
    }

    /// Whether any graph group is enabled
    pub fn needs_graph(&self) -> bool {
        self.graph_target || self.graph_source
    }
}

/// Parse a snake_case enum value such as `census_cliques`
fn parse_variant<T: serde::de::DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase())).ok()
}

/// Read and parse `{prefix}_{name}`; `None` when the variable is unset
fn env_override<T>(
    prefix: &str,
    name: &str,
    strict: bool,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    let key = format!("{}_{}", prefix, name);
    let Ok(raw) = std::env::var(&key) else {
        return Ok(None);
    };
    match parse(&raw) {
        Some(value) => Ok(Some(value)),
        None if strict => Err(FeatureError::Configuration(format!(
            "{} has invalid value {:?}",
            key, raw
        ))),
        None => {
            warn!("Ignoring {}: invalid value {:?}", key, raw);
            Ok(None)
        }
    }
}

impl Config {
    /// Create new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from environment variables (with prefix)
    pub fn from_env(prefix: &str) -> Self {
        Self::default().with_env_overrides(prefix)
    }

    /// Apply `{prefix}_*` environment overrides.
    ///
    /// Unparseable values are logged with `warn!` and the current setting is kept.
    pub fn with_env_overrides(self, prefix: &str) -> Self {
        match self.clone().apply_env(prefix, false) {
            Ok(config) => config,
            Err(_) => self,
        }
    }

    /// Apply `{prefix}_*` environment overrides, failing on the first
    /// unparseable value
    pub fn try_with_env_overrides(self, prefix: &str) -> Result<Self> {
        self.apply_env(prefix, true)
    }

    fn apply_env(mut self, prefix: &str, strict: bool) -> Result<Self> {
        let number = |v: &str| v.trim().parse().ok();

        if let Some(v) = env_override(prefix, "MIN_EGO_NODES", strict, number)? {
            self.graph.min_ego_nodes = v;
        }
        if let Some(mode) = env_override(prefix, "ANALYZER_MODE", strict, parse_variant)? {
            self.graph.analyzer_mode = mode;
        }
        if let Some(polarity) = env_override(prefix, "GRAPH_POLARITY", strict, parse_variant)? {
            self.graph.graph_polarity = polarity;
        }
        if let Some(v) = env_override(prefix, "STREAK_CAP", strict, number)? {
            self.history.streak_cap = v;
        }
        if let Some(v) = env_override(prefix, "VELOCITY_WINDOW_MINUTES", strict, |v| v.trim().parse().ok())? {
            self.velocity.window_minutes = v;
        }
        if let Some(policy) = env_override(prefix, "VISIBILITY", strict, parse_variant)? {
            self.visibility = policy;
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.graph.min_ego_nodes < 3 {
            return Err(FeatureError::Configuration(
                "min_ego_nodes must be at least 3".to_string(),
            ));
        }

        if self.history.streak_cap == 0 {
            return Err(FeatureError::Configuration(
                "streak_cap must be positive".to_string(),
            ));
        }

        if self.velocity.window_minutes <= 0 {
            return Err(FeatureError::Configuration(
                "velocity window must be positive".to_string(),
            ));
        }
        if self.velocity.window_minutes > MAX_WINDOW_HOURS * 60 {
            return Err(FeatureError::Configuration(format!(
                "velocity window of {} minutes exceeds {} hours",
                self.velocity.window_minutes, MAX_WINDOW_HOURS
            )));
        }

        let hours = &self.velocity.directional_windows_hours;
        if hours.iter().any(|&h| h <= 0) {
            return Err(FeatureError::Configuration(
                "directional velocity windows must be positive".to_string(),
            ));
        }
        if let Some(h) = hours.iter().find(|&&h| h > MAX_WINDOW_HOURS) {
            return Err(FeatureError::Configuration(format!(
                "directional velocity window of {} hours exceeds {} hours",
                h, MAX_WINDOW_HOURS
            )));
        }
        if (1..hours.len()).any(|i| hours[..i].contains(&hours[i])) {
            return Err(FeatureError::Configuration(
                "directional velocity windows must be distinct".to_string(),
            ));
        }

        if !self.groups.any() {
            return Err(FeatureError::Configuration(
                "no feature groups enabled".to_string(),
            ));
        }

        if self.graph.graph_polarity != Polarity::Positive && self.groups.needs_graph() {
            warn!(
                "Trust graph built from {:?} ratings; census features assume positive trust edges",
                self.graph.graph_polarity
            );
        }

        Ok(())
    }
}

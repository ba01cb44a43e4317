//! Per-event feature assembly
//!
//! Combines history, topology and velocity features into one row per
//! rating, each computed as of that rating's own timestamp.

use std::ops::Range;

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::history::{HistoricalProfileComputer, SequentialFeatures, SourceHistory, TargetHistory};
use super::topology::{EgoGraphAnalyzer, TopologyFeatures};
use super::velocity::{DirectionalVelocity, VelocityCache, VelocityComputer};
use crate::data::{RatingEvent, RatingStore, Role};
use crate::error::Result;
use crate::graph::{TemporalGraphBuilder, TrustGraph};
use crate::utils::Config;

const PROGRESS_EVERY: usize = 1000;

/// Assembled features, one row per rating event
#[derive(Clone, Debug)]
pub struct FeatureTable {
    /// Feature names
    columns: Vec<String>,
    /// Rating each row belongs to
    events: Vec<RatingEvent>,
    /// Feature matrix (rows = events, columns = features)
    data: Array2<f64>,
}

impl FeatureTable {
    /// Feature column names (excluding the four rating fields)
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Ratings in row order
    pub fn events(&self) -> &[RatingEvent] {
        &self.events
    }

    /// Feature matrix
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Get the number of features
    pub fn num_features(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// View of a column by name
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let idx = self.column_index(name)?;
        Some(self.data.column(idx))
    }

    /// Get feature by name
    pub fn get(&self, name: &str) -> Option<Vec<f64>> {
        self.column(name).map(|c| c.to_vec())
    }

    /// Feature values of one row
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        (index < self.len()).then(|| self.data.row(index).to_vec())
    }

    /// New table without `drop` and with `add` appended on the right
    pub(crate) fn with_columns(&self, drop: &[String], add: Vec<(String, Vec<f64>)>) -> FeatureTable {
        let kept: Vec<usize> = (0..self.columns.len())
            .filter(|&j| !drop.contains(&self.columns[j]))
            .collect();

        let mut columns: Vec<String> = kept.iter().map(|&j| self.columns[j].clone()).collect();
        columns.extend(add.iter().map(|(name, _)| name.clone()));

        let n = self.len();
        let mut data = Array2::zeros((n, columns.len()));
        for i in 0..n {
            for (k, &j) in kept.iter().enumerate() {
                data[[i, k]] = self.data[[i, j]];
            }
            for (k, (_, values)) in add.iter().enumerate() {
                data[[i, kept.len() + k]] = finite(values[i]);
            }
        }

        FeatureTable {
            columns,
            events: self.events.clone(),
            data,
        }
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Point-query features of one event; max velocity is filled in later
struct PointRow {
    head: Vec<f64>,
    /// Current velocity of (target, source)
    velocity: Option<(usize, usize)>,
    tail: Vec<f64>,
}

/// Runs of consecutive events sharing a timestamp
fn timestamp_runs(events: &[RatingEvent]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=events.len() {
        if i == events.len() || events[i].timestamp != events[start].timestamp {
            runs.push(start..i);
            start = i;
        }
    }
    runs
}

/// Builds the feature table for a rating store
#[derive(Debug, Clone, Default)]
pub struct FeatureRecordAssembler {
    config: Config,
}

impl FeatureRecordAssembler {
    /// Create an assembler with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assembler with custom config
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn analyzer(&self) -> EgoGraphAnalyzer {
        EgoGraphAnalyzer::new(self.config.graph.analyzer_mode, self.config.graph.min_ego_nodes)
    }

    /// Output feature columns in order
    pub fn columns(&self) -> Vec<String> {
        let groups = &self.config.groups;
        let mode = self.config.graph.analyzer_mode;
        let mut columns: Vec<String> = Vec::new();

        if groups.historical_target {
            columns.extend(TargetHistory::NAMES.iter().map(|s| s.to_string()));
        }
        if groups.historical_source {
            columns.extend(SourceHistory::NAMES.iter().map(|s| s.to_string()));
        }
        if groups.sequential {
            columns.extend(SequentialFeatures::NAMES.iter().map(|s| s.to_string()));
        }
        if groups.graph_target {
            columns.extend(TopologyFeatures::names(mode, Role::Target));
        }
        if groups.graph_source {
            columns.extend(TopologyFeatures::names(mode, Role::Source));
        }
        if groups.velocity {
            for role in [Role::Target, Role::Source] {
                columns.push(format!("velocity_{}", role.suffix()));
                columns.push(format!("max_velocity_{}", role.suffix()));
            }
        }
        if groups.directional_velocity {
            for &hours in &self.config.velocity.directional_windows_hours {
                columns.extend(DirectionalVelocity::names(hours, Role::Target));
                columns.extend(DirectionalVelocity::names(hours, Role::Source));
            }
        }
        columns
    }

    /// Compute features for every event in timestamp order
    pub fn assemble(&self, store: &RatingStore) -> Result<FeatureTable> {
        self.start(store)?;
        let runs = timestamp_runs(store.events());

        let rows: Vec<PointRow> = runs
            .iter()
            .flat_map(|run| self.run_rows(store, run.clone()))
            .collect();
        self.finish(store, rows)
    }

    /// Same output as [`assemble`](Self::assemble), with point queries
    /// computed on the rayon thread pool
    pub fn assemble_parallel(&self, store: &RatingStore) -> Result<FeatureTable> {
        self.start(store)?;
        let runs = timestamp_runs(store.events());

        let rows: Vec<PointRow> = runs
            .par_iter()
            .map(|run| self.run_rows(store, run.clone()))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();
        self.finish(store, rows)
    }

    fn start(&self, store: &RatingStore) -> Result<()> {
        self.config.validate()?;
        if store.policy() != self.config.visibility {
            warn!(
                "Store visibility {:?} differs from configured {:?}; using the store's",
                store.policy(),
                self.config.visibility
            );
        }
        info!(
            "Assembling {} features for {} ratings",
            self.columns().len(),
            store.len()
        );
        Ok(())
    }

    /// Point features for the events of one timestamp run, sharing one graph
    fn run_rows(&self, store: &RatingStore, run: Range<usize>) -> Vec<PointRow> {
        let events = &store.events()[run.clone()];
        let Some(first) = events.first() else {
            return Vec::new();
        };

        let graph = self.config.groups.needs_graph().then(|| {
            TemporalGraphBuilder::new(store).build(first.timestamp, self.config.graph.graph_polarity, None)
        });

        if run.start / PROGRESS_EVERY != run.end / PROGRESS_EVERY {
            debug!("Processed {} of {} ratings", run.end, store.len());
        }

        events
            .iter()
            .map(|event| self.point_row(store, graph.as_ref(), event))
            .collect()
    }

    fn point_row(&self, store: &RatingStore, graph: Option<&TrustGraph>, event: &RatingEvent) -> PointRow {
        let groups = &self.config.groups;
        let cutoff = event.timestamp;
        let history = HistoricalProfileComputer::new(store).with_streak_cap(self.config.history.streak_cap);
        let velocity = VelocityComputer::new(store);

        let mut head = Vec::new();
        if groups.historical_target {
            head.extend(history.target(event.ratee, cutoff).values());
        }
        if groups.historical_source {
            head.extend(history.source(event.rater, cutoff).values());
        }
        if groups.sequential {
            head.extend(history.sequential(event.ratee, cutoff).values());
        }
        if let Some(graph) = graph {
            let analyzer = self.analyzer();
            if groups.graph_target {
                head.extend(analyzer.analyze_values(graph, event.ratee));
            }
            if groups.graph_source {
                head.extend(analyzer.analyze_values(graph, event.rater));
            }
        }

        let current = groups.velocity.then(|| {
            let window = self.config.velocity.window();
            (
                velocity.current_velocity(event.ratee, cutoff, window),
                velocity.current_velocity(event.rater, cutoff, window),
            )
        });

        let mut tail = Vec::new();
        if groups.directional_velocity {
            for &hours in &self.config.velocity.directional_windows_hours {
                tail.extend(velocity.directional(event.ratee, cutoff, hours).values());
                tail.extend(velocity.directional(event.rater, cutoff, hours).values());
            }
        }

        PointRow {
            head,
            velocity: current,
            tail,
        }
    }

    /// Derive max velocities in timestamp order and build the table
    fn finish(&self, store: &RatingStore, rows: Vec<PointRow>) -> Result<FeatureTable> {
        let columns = self.columns();
        let events = store.events().to_vec();
        let velocity = VelocityComputer::new(store);
        let mut cache = VelocityCache::new();
        let mut data = Array2::zeros((events.len(), columns.len()));

        for (i, (event, row)) in events.iter().zip(rows).enumerate() {
            let mut values = row.head;

            if let Some((target, source)) = row.velocity {
                let max_target = velocity.max_velocity(&cache, event.ratee, event.timestamp);
                let max_source = velocity.max_velocity(&cache, event.rater, event.timestamp);

                cache.record(event.ratee, event.timestamp, target)?;
                if event.rater != event.ratee {
                    cache.record(event.rater, event.timestamp, source)?;
                }
                values.extend([target as f64, max_target as f64, source as f64, max_source as f64]);
            }
            values.extend(row.tail);

            for (j, value) in values.into_iter().enumerate() {
                data[[i, j]] = finite(value);
            }
        }

        info!(
            "Assembled {} rows, velocity tracked for {} users",
            events.len(),
            cache.user_count()
        );
        Ok(FeatureTable { columns, events, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::FeatureGroups;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 6, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn store() -> RatingStore {
        RatingStore::from_events(vec![
            RatingEvent::new(1, 2, 4, t(0)),
            RatingEvent::new(3, 2, 5, t(2)),
            RatingEvent::new(4, 2, -6, t(2)),
            RatingEvent::new(2, 3, 1, t(5)),
            RatingEvent::new(4, 3, 2, t(30)),
            RatingEvent::new(1, 2, -1, t(31)),
        ])
    }

    #[test]
    fn test_timestamp_runs() {
        let runs = timestamp_runs(store().events());
        assert_eq!(runs, vec![0..1, 1..3, 3..4, 4..5, 5..6]);
        assert!(timestamp_runs(&[]).is_empty());
    }

    #[test]
    fn test_default_columns() {
        let assembler = FeatureRecordAssembler::new();
        let columns = assembler.columns();
        // 9 + 4 + 2 + 14 + 14 + 4 + 2 * 2 * 7
        assert_eq!(columns.len(), 75);
        assert!(columns.contains(&"triad_300_target".to_string()));
        assert!(columns.contains(&"betweenness_source".to_string()));
        assert!(columns.contains(&"max_velocity_target".to_string()));
        assert!(columns.contains(&"vel_48_all_target".to_string()));
        assert!(columns.contains(&"vel_24_out_neg_source".to_string()));
    }

    #[test]
    fn test_one_row_per_event() {
        let table = FeatureRecordAssembler::new().assemble(&store()).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.num_features(), 75);
        assert_eq!(table.events()[5].rating, -1);
        assert!(table.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_velocity_columns() {
        let mut config = Config::default();
        config.groups = FeatureGroups::none();
        config.groups.velocity = true;
        let table = FeatureRecordAssembler::with_config(config).assemble(&store()).unwrap();

        assert_eq!(table.columns(), ["velocity_target", "max_velocity_target", "velocity_source", "max_velocity_source"]);
        let velocity = table.get("velocity_target").unwrap();
        let max = table.get("max_velocity_target").unwrap();
        assert_eq!(velocity, vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
        // rows 1 and 2 share t=2, so neither sees the other's velocity;
        // user 2 peaks at 3 as the rater at t=5
        assert_eq!(max, vec![0.0, 0.0, 0.0, 0.0, 1.0, 3.0]);
        assert_eq!(table.get("velocity_source").unwrap()[3], 3.0);
    }

    #[test]
    fn test_directional_columns_cover_both_sides() {
        let mut config = Config::default();
        config.groups = FeatureGroups::none();
        config.groups.directional_velocity = true;
        config.velocity.directional_windows_hours = vec![24];
        let table = FeatureRecordAssembler::with_config(config).assemble(&store()).unwrap();

        assert_eq!(table.num_features(), 14);
        assert_eq!(table.columns()[0], "vel_24_in_neg_target");
        assert_eq!(table.columns()[7], "vel_24_in_neg_source");

        // 2 -> 3 at t=5: ratee 3 has only rated 2, rater 2 has received three ratings
        let row = table.row(3).unwrap();
        assert_eq!(row[..7], [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(row[7..], [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_history_columns() {
        let mut config = Config::default();
        config.groups = FeatureGroups::none();
        config.groups.historical_target = true;
        let table = FeatureRecordAssembler::with_config(config).assemble(&store()).unwrap();

        let received = table.get("num_ratings_received").unwrap();
        assert_eq!(received, vec![0.0, 1.0, 1.0, 0.0, 1.0, 3.0]);
        assert_eq!(table.row(5).unwrap()[1], 1.0);
        assert!(table.row(6).is_none());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let assembler = FeatureRecordAssembler::new();
        let store = store();
        let sequential = assembler.assemble(&store).unwrap();
        let parallel = assembler.assemble_parallel(&store).unwrap();

        assert_eq!(sequential.columns(), parallel.columns());
        assert_eq!(sequential.data(), parallel.data());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.groups = FeatureGroups::none();
        assert!(FeatureRecordAssembler::with_config(config).assemble(&store()).is_err());
    }
}

//! Features derived from an assembled table.

use super::assembler::FeatureTable;
use super::topology::CENSUS_FIELDS;
use crate::data::Role;
use crate::error::{FeatureError, Result};

fn require<'a>(table: &'a FeatureTable, name: &str) -> Result<ndarray::ArrayView1<'a, f64>> {
    table
        .column(name)
        .ok_or_else(|| FeatureError::Configuration(format!("missing column `{}`", name)))
}

fn side(role: Role) -> Result<&'static str> {
    match role {
        Role::Target | Role::Source => Ok(role.suffix()),
        Role::Either => Err(FeatureError::Configuration(
            "triad normalization needs a target or source side".to_string(),
        )),
    }
}

/// `triad_300` -> `300`
fn bucket_label(field: &str) -> &str {
    field.trim_start_matches("triad_")
}

/// Replace the raw census columns of one side by counts per rater.
///
/// Every `triad_{bucket}_{side}` column becomes `{bucket}_norm_{side}`,
/// divided by `neighbors_in_{side}` (users without raters divide by 1).
pub fn normalize_triads(table: &FeatureTable, role: Role) -> Result<FeatureTable> {
    let side = side(role)?;
    let neighbors = require(table, &format!("neighbors_in_{}", side))?;

    let mut drop = Vec::with_capacity(CENSUS_FIELDS.len());
    let mut add = Vec::with_capacity(CENSUS_FIELDS.len());
    for field in CENSUS_FIELDS {
        let raw_name = format!("{}_{}", field, side);
        let raw = require(table, &raw_name)?;

        let normalized: Vec<f64> = raw
            .iter()
            .zip(neighbors.iter())
            .map(|(&count, &n)| count / n.max(1.0))
            .collect();

        add.push((format!("{}_norm_{}", bucket_label(field), side), normalized));
        drop.push(raw_name);
    }

    Ok(table.with_columns(&drop, add))
}

/// Target-minus-source differences of the normalized graph features.
///
/// Needs both sides normalized by [`normalize_triads`]. Adds one
/// `{feature}_diff` column per pair and drops the source side columns.
pub fn source_target_difference(table: &FeatureTable) -> Result<FeatureTable> {
    let mut features: Vec<String> = CENSUS_FIELDS
        .iter()
        .map(|field| format!("{}_norm", bucket_label(field)))
        .collect();
    features.extend(
        ["neighbors_in", "betweenness", "excess_ratings_in", "cluster_coef"]
            .iter()
            .map(|s| s.to_string()),
    );

    let mut drop = Vec::with_capacity(features.len());
    let mut add = Vec::with_capacity(features.len());
    for feature in &features {
        let source_name = format!("{}_source", feature);
        let target = require(table, &format!("{}_target", feature))?;
        let source = require(table, &source_name)?;

        let diff: Vec<f64> = target.iter().zip(source.iter()).map(|(t, s)| t - s).collect();
        let label = feature.trim_end_matches("_norm");
        add.push((format!("{}_diff", label), diff));
        drop.push(source_name);
    }

    Ok(table.with_columns(&drop, add))
}

//! Basic feature computation example
//!
//! This example demonstrates how to:
//! 1. Load a small rating history
//! 2. Inspect the trust graph as of a point in time
//! 3. Compute one feature row per rating
//! 4. Derive normalized census features

use chrono::{Duration, TimeZone, Utc};
use trust_rating_features::{
    data::{Polarity, RatingRecord, RatingStore, Role},
    features::{normalize_triads, EgoGraphAnalyzer, FeatureRecordAssembler},
    graph::{TemporalGraphBuilder, TriadicCensus},
    utils::Config,
};

fn main() -> anyhow::Result<()> {
    println!("=== Trust-Rating Fraud Features ===\n");

    // A ring of accounts vouching for user 1, then one outsider complaining
    let start = Utc.with_ymd_and_hms(2011, 11, 8, 18, 0, 0).unwrap();
    let ratings = [
        (2, 1, 10),
        (3, 1, 10),
        (4, 1, 10),
        (1, 2, 10),
        (2, 3, 9),
        (3, 4, 9),
        (4, 2, 9),
        (3, 2, 8),
        (7, 1, -10),
        (8, 1, -7),
    ];
    let records: Vec<RatingRecord> = ratings
        .iter()
        .enumerate()
        .map(|(i, &(rater, ratee, rating))| {
            let at = start + Duration::minutes(4 * i as i64);
            RatingRecord::new(rater.to_string(), ratee.to_string(), rating.to_string(), at.to_rfc3339())
        })
        .collect();

    let store = RatingStore::load(records)?;
    println!("Loaded {} ratings between {} users", store.len(), store.user_count());

    // Trust graph just before the first complaint
    let cutoff = store.events()[8].timestamp;
    let graph = TemporalGraphBuilder::new(&store).build(cutoff, Polarity::Positive, None);
    println!(
        "\nPositive trust graph at {}: {} users, {} edges",
        cutoff,
        graph.node_count(),
        graph.edge_count()
    );

    if let Some(ego) = graph.raters_ego_graph(1) {
        println!("Ego graph of user 1 ({} users):", ego.node_count());
        for (triad, count) in TriadicCensus::compute(&ego).iter().filter(|(_, c)| *c > 0) {
            println!("  {:>4}: {}", triad.name(), count);
        }
    }

    let topology = EgoGraphAnalyzer::default().analyze(&graph, 1);
    println!(
        "  clustering {:.3}, raters {}, excess ratings in {:.3}",
        topology.cluster_coef, topology.neighbors_in, topology.excess_ratings_in
    );

    // Full feature table
    let assembler = FeatureRecordAssembler::with_config(Config::default());
    let table = assembler.assemble(&store)?;
    println!("\nFeature table: {} rows x {} features", table.len(), table.num_features());

    let table = normalize_triads(&table, Role::Target)?;
    let received = table.get("num_ratings_received").unwrap_or_default();
    let closed = table.get("300_norm_target").unwrap_or_default();
    let velocity = table.get("velocity_target").unwrap_or_default();

    println!("\n{:>6} {:>6} {:>7} {:>9} {:>10} {:>9}", "rater", "ratee", "rating", "received", "300/rater", "velocity");
    println!("{:-<52}", "");
    for (i, event) in table.events().iter().enumerate() {
        println!(
            "{:>6} {:>6} {:>7} {:>9} {:>10.3} {:>9}",
            event.rater, event.ratee, event.rating, received[i], closed[i], velocity[i]
        );
    }

    println!("\n=== Done ===");
    Ok(())
}

//! Batch feature builder
//!
//! Reads a headerless `rater,ratee,rating,time` CSV and writes one feature
//! row per rating.
//!
//! ```bash
//! cargo run --release --bin build_features -- \
//!     --input soc-sign-bitcoinotc.csv --output features.csv --parallel
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use trust_rating_features::data::DataLoader;
use trust_rating_features::features::FeatureRecordAssembler;
use trust_rating_features::utils::Config;

#[derive(Parser)]
#[command(name = "build_features")]
#[command(about = "Point-in-time fraud features for trust ratings")]
struct Cli {
    /// Ratings CSV (rater, ratee, rating, time)
    #[arg(short, long)]
    input: PathBuf,

    /// Output feature CSV
    #[arg(short, long, default_value = "features.csv")]
    output: PathBuf,

    /// JSON configuration file; defaults plus TRF_* environment overrides otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compute point features on all cores
    #[arg(short, long)]
    parallel: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    }
    .try_with_env_overrides("TRF")
    .context("invalid TRF_* environment override")?;
    config.validate().context("invalid configuration")?;

    let store = DataLoader::load_ratings(&cli.input)
        .with_context(|| format!("loading ratings from {}", cli.input.display()))?
        .with_policy(config.visibility);

    let assembler = FeatureRecordAssembler::with_config(config);
    let started = Instant::now();
    let table = if cli.parallel {
        assembler.assemble_parallel(&store)?
    } else {
        assembler.assemble(&store)?
    };
    info!(
        "Computed {} x {} features in {:.1?}",
        table.len(),
        table.num_features(),
        started.elapsed()
    );

    DataLoader::save_features(&table, &cli.output)
        .with_context(|| format!("writing features to {}", cli.output.display()))?;

    Ok(())
}

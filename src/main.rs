use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use tracing::error;

use geoharvest::config::SinkConfig;
use geoharvest::constants::{BORIS_STAGING_DIR, FLOOD_STAGING_DIR};
use geoharvest::error::Result;
use geoharvest::harvester::{FloodOptions, FloodSource, HarvestRun, RunCounters, RunOptions};
use geoharvest::logging;
use geoharvest::sink::{PostgrestSink, Sink};
use geoharvest::types::RiskZone;

#[derive(Parser)]
#[command(name = "geoharvest")]
#[command(about = "Geodata harvester for German open-data flood and land-value datasets")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest flood-risk zones (Berlin WFS + NRW shapefile archives)
    Hochwasser {
        /// Stop after this many features across all sub-datasets
        #[arg(long)]
        limit: Option<u64>,
        /// Run every stage except sink writes; print sampled records
        #[arg(long)]
        dry_run: bool,
        /// Restrict to one source: berlin or nrw
        #[arg(long)]
        source: Option<String>,
        /// Restrict NRW harvesting to one risk zone: HQ100, HQhaeufig or HQextrem
        #[arg(long)]
        risikozone: Option<String>,
    },
    /// Harvest NRW BORIS ground values (Bodenrichtwerte)
    Boris {
        /// Stop after this many features
        #[arg(long)]
        limit: Option<u64>,
        /// Run every stage except sink writes; print sampled records
        #[arg(long)]
        dry_run: bool,
        /// Restrict to one municipality
        #[arg(long)]
        gemeinde: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("run failed: {}", e);
        eprintln!("❌ Fatal: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Hochwasser {
            limit,
            dry_run,
            source,
            risikozone,
        } => {
            let source = source.map(|s| s.parse::<FloodSource>()).transpose()?;
            let risikozone = risikozone.map(|z| z.parse::<RiskZone>()).transpose()?;

            println!("🌊 Hochwasserkarten Harvester — Berlin & NRW");
            if let Some(source) = &source {
                println!("   Source:     {source}");
            }
            if let Some(zone) = &risikozone {
                println!("   Risikozone: {zone}");
            }
            if let Some(limit) = limit {
                println!("   Limit:      {limit}");
            }
            if dry_run {
                println!("   🔸 DRY RUN — no database writes");
            }
            println!();

            let sink = build_sink(dry_run)?;
            let options = RunOptions {
                limit: limit.unwrap_or(u64::MAX),
                dry_run,
            };
            let mut run = HarvestRun::new(options, sink, FLOOD_STAGING_DIR);
            let totals = run
                .harvest_flood(&FloodOptions { source, risikozone })
                .await?;
            print_summary(totals);
        }
        Commands::Boris {
            limit,
            dry_run,
            gemeinde,
        } => {
            println!("🌍 NRW BORIS Bodenrichtwerte Harvester");
            println!("   Source: OpenGeodata NRW Shapefiles");
            if let Some(gemeinde) = &gemeinde {
                println!("   Filter: Gemeinde = {gemeinde}");
            }
            if let Some(limit) = limit {
                println!("   Limit:  {limit}");
            }
            if dry_run {
                println!("   🔸 DRY RUN — no database writes");
            }
            println!();

            let sink = build_sink(dry_run)?;
            let options = RunOptions {
                limit: limit.unwrap_or(u64::MAX),
                dry_run,
            };
            let mut run = HarvestRun::new(options, sink, BORIS_STAGING_DIR);
            let totals = run.harvest_ground_values(gemeinde.as_deref()).await?;
            print_summary(totals);
        }
    }
    Ok(())
}

/// Credential check happens here, before any download or sink I/O.
fn build_sink(dry_run: bool) -> Result<Option<Arc<dyn Sink>>> {
    if dry_run {
        return Ok(None);
    }
    let config = SinkConfig::from_env()?;
    Ok(Some(Arc::new(PostgrestSink::new(config))))
}

fn print_summary(totals: RunCounters) {
    println!("🏁 Done.");
    println!("   Total read:     {}", totals.read);
    println!("   Total upserted: {}", totals.upserted);
    println!("   Skipped:        {}", totals.skipped);
}

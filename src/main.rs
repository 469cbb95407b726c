mod args;

use anyhow::{bail, Context, Result};
use args::{prompt_interactive, BssidSource, LocatorArgs};
use bssid_locator::batch::resolve_batch;
use bssid_locator::client::{LocationClient, ResolveOptions};
use bssid_locator::config::ClientConfig;
use bssid_locator::export::{only_moved, render_console, write_kml, write_tsv};
use bssid_locator::logging::{cli_level, init_tracing};
use bssid_locator::movement::{MovementConfig, MovementDetector};
use bssid_locator::snapshot::{load_previous, RunParameters, Snapshot};
use bssid_locator::{read_bssid_file, AccessPointRecord, Bssid, MovementRecord};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = LocatorArgs::parse();

    if args.interactive {
        args = prompt_interactive(args)?;
    }

    init_tracing(cli_level(args.debug));
    print_banner();

    run(args).await
}

fn print_banner() {
    println!("📡 BSSID Locator v{}", bssid_locator::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("⚠️  Only locate networks you own or are authorized to audit.");
    println!("   Location data about other people's equipment is personal data.");
}

async fn run(args: LocatorArgs) -> Result<()> {
    let execution_timestamp = chrono::Utc::now().timestamp_millis();

    // 1. Validate input before touching the network
    let bssids: Vec<Bssid> = match args.source()? {
        BssidSource::Single(bssid) => vec![bssid],
        BssidSource::File(path) => {
            println!("\n📂 Reading BSSIDs from {}...", path.display());
            read_bssid_file(&path)?
        }
    };
    if bssids.is_empty() {
        bail!("No valid BSSIDs to process");
    }

    let previous = match &args.compare {
        Some(path) => {
            if !path.is_file() {
                bail!("Comparison file not found: {}", path.display());
            }
            let previous = load_previous(path)
                .with_context(|| format!("Failed to load comparison file {}", path.display()))?;
            println!("✓ Loaded {} previous locations from {}", previous.len(), path.display());
            Some(previous)
        }
        None => None,
    };

    // 2. Resolve
    println!(
        "\n🛰️  Geolocating {} BSSID(s) with concurrency {}...",
        bssids.len(),
        args.concurrency.max(1)
    );
    let client = LocationClient::new(ClientConfig::default()).context("Failed to build HTTP client")?;
    let outcome = resolve_batch(&client, &bssids, args.concurrency, ResolveOptions::debug(args.debug)).await;

    let mut locations = outcome.locations;
    if args.max_hacc >= 0 {
        let before = locations.len();
        locations.retain_accuracy(args.max_hacc);
        println!(
            "✓ Accuracy filter (<= {}m): kept {} of {} locations",
            args.max_hacc,
            locations.len(),
            before
        );
    }

    // 3. Compare
    let movements: Vec<MovementRecord> = match &previous {
        Some(previous) => {
            let detector = MovementDetector::new(MovementConfig::from_cli(args.min_distance, args.max_hacc));
            let movements = detector.detect(&locations.to_map(), previous);
            println!(
                "🚚 Detected {} BSSID(s) that moved beyond accuracy + {}m",
                movements.len(),
                args.min_distance
            );
            movements
        }
        None => Vec::new(),
    };

    let records = locations.into_records();
    let output_locations = if args.movement_only {
        let moved = only_moved(&records, &movements);
        println!("✓ Movement-only: {} location(s) kept", moved.len());
        moved
    } else {
        records
    };

    // 4. Outputs
    write_outputs(&args, execution_timestamp, &output_locations, &movements)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Done");
    println!("   Requested:  {}", bssids.len());
    println!("   Resolved:   {}", outcome.succeeded);
    println!("   Empty:      {}", outcome.empty);
    println!("   Failed:     {}", outcome.failed);
    println!("   Locations:  {}", output_locations.len());
    if previous.is_some() {
        println!("   Movements:  {}", movements.len());
    }

    Ok(())
}

fn write_outputs(
    args: &LocatorArgs,
    execution_timestamp: i64,
    locations: &[AccessPointRecord],
    movements: &[MovementRecord],
) -> Result<()> {
    let compared = args.compare.is_some();

    if let Some(path) = &args.kml {
        write_kml(path, locations, movements, args.movement_only)?;
        println!("🗺️  KML written to {}", path.display());
    }

    if let Some(path) = &args.json_out {
        let snapshot = Snapshot {
            execution_timestamp,
            parameters: run_parameters(args),
            locations: locations.to_vec(),
            movements_detected: movements.to_vec(),
        };
        snapshot
            .save(path)
            .with_context(|| format!("Failed to write JSON file {}", path.display()))?;
        println!("💾 JSON written to {}", path.display());
    } else if let Some(path) = args.tsv_out() {
        write_tsv(path, locations, movements, compared)?;
        println!("📄 TSV written to {}", path.display());
    }

    if args.to_stdout() {
        println!("\n--- Geolocated BSSIDs ---");
        print!("{}", render_console(locations, movements, compared));
    }

    Ok(())
}

fn run_parameters(args: &LocatorArgs) -> RunParameters {
    RunParameters {
        infile: args.infile.as_ref().map(|p| p.display().to_string()),
        bssid: args.bssid.clone(),
        compare_file: args.compare.as_ref().map(|p| p.display().to_string()),
        movement_only: args.movement_only,
        min_distance_meters: args.min_distance,
        max_hacc: args.max_hacc,
        concurrency: args.concurrency,
    }
}

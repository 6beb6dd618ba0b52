//! Rescue Vessel Stationing CLI
//!
//! Plans one scenario and appends its run record to a JSON-lines file.
//!
//! Usage:
//!   plan-stations --seed 4 --zones 100 --clusters 40 \
//!                 --water north-sea --variant best-tidal \
//!                 --output results/north_sea.jsonl

use anyhow::Result;
use clap::{Parser, ValueEnum};
use coverage_model::{CoveragePolicy, ModelVariant, SolverConfig, DEFAULT_TIME_LIMIT};
use rescue_scenario::Water;
use station_planner::record::{append_run_record, SolutionReport};
use station_planner::{DataLayout, Planner, PlannerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WaterArg {
    NorthSea,
    BalticSea,
    All,
}

impl From<WaterArg> for Water {
    fn from(arg: WaterArg) -> Self {
        match arg {
            WaterArg::NorthSea => Water::NorthSea,
            WaterArg::BalticSea => Water::BalticSea,
            WaterArg::All => Water::All,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantArg {
    ManyZones,
    BetterTidal,
    BestTidal,
}

impl From<VariantArg> for ModelVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::ManyZones => ModelVariant::ManyZones,
            VariantArg::BetterTidal => ModelVariant::BetterTidal,
            VariantArg::BestTidal => ModelVariant::BestTidal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "plan-stations",
    about = "Station rescue vessel types so expected incident response time is minimal"
)]
struct Args {
    /// Random seed for allowances, incidents and the zone file
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Number of zones to load before clustering
    #[arg(short, long, default_value_t = 100)]
    zones: usize,

    /// Number of zones after clustering (defaults to --zones)
    #[arg(short, long)]
    clusters: Option<usize>,

    /// Water body to plan for
    #[arg(short, long, value_enum, default_value_t = WaterArg::NorthSea)]
    water: WaterArg,

    /// Coverage model variant
    #[arg(long, value_enum, default_value_t = VariantArg::BestTidal)]
    variant: VariantArg,

    /// JSON-lines file the run record is appended to
    #[arg(short, long, default_value = "results/runs.jsonl")]
    output: PathBuf,

    /// Also write the station assignment here
    #[arg(long)]
    solution: Option<PathBuf>,

    /// Data directory (falls back to RESCUE_DATA_DIR, then ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Solver time limit in seconds
    #[arg(long, default_value_t = DEFAULT_TIME_LIMIT.as_secs())]
    time_limit: u64,

    /// Penalty per unserved incident instead of requiring full coverage
    #[arg(long)]
    penalty: Option<f64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("{}", "=".repeat(60));
    info!("Rescue Vessel Station Planner");
    info!("{}", "=".repeat(60));

    let layout = args.data_dir.map(DataLayout::new).unwrap_or_else(DataLayout::from_env);
    let policy = match args.penalty {
        Some(penalty) => CoveragePolicy::Penalized { penalty },
        None => CoveragePolicy::Strict,
    };
    let config = PlannerConfig::new(args.seed, args.zones, args.water.into(), args.variant.into())
        .with_clusters(args.clusters.unwrap_or(args.zones))
        .with_policy(policy)
        .with_solver(SolverConfig::default().with_time_limit(Duration::from_secs(args.time_limit)));
    info!("Data directory: {:?}", layout.root());

    let planner = Planner::new(layout, config);
    let plan = planner.run()?;

    append_run_record(&args.output, &plan.record)?;

    if let Some(path) = &args.solution {
        let report = SolutionReport::new(
            &plan.scenario,
            plan.record.solver_type,
            &plan.outcome,
            &plan.assignment,
            plan.evaluation,
        )?;
        report.write(path)?;
    }

    // Summary
    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Status: {}", plan.record.status);
    info!("Solver objective: {}", plan.record.result);
    match plan.record.compare_val {
        Some(value) => info!("Compare value: {}", value),
        None => info!(
            "Compare value: unserved ({} triples, mass {:.4}, weight {:.4})",
            plan.record.unfulfilled_count, plan.record.unfulfilled_mass, plan.record.unfulfilled_weight
        ),
    }
    for (station, vessel) in plan.assignment.iter() {
        let station_name = plan.scenario.station(station).map(|s| s.name.as_str()).unwrap_or("?");
        let vessel_name = plan.scenario.vessel(vessel).map(|v| v.name.as_str()).unwrap_or("?");
        info!("  {:30} | {}", station_name, vessel_name);
    }

    Ok(())
}

//! End-to-end planning runs against a small data directory

use coverage_model::{
    CoveragePolicy, IntegerProgram, MicroLpSolver, ModelVariant, SolveOutcome, SolveStatus, Solver,
};
use rescue_scenario::Water;
use station_planner::record::{append_run_record, read_run_records, NO_RESULT};
use station_planner::{DataLayout, Planner, PlannerConfig, PlannerError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tidal_shares::ShareStore;

const SEED: u64 = 3;
const ZONES: usize = 4;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Two gauges, three stations, two vessel classes and a four-zone table.
/// The first station sits on gauge 1, which never drops low enough to
/// close it, so every tide row has an open station.
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        &root.join("fleet").join("stations.json"),
        r#"[
            {"name": "Hafen", "callsign": "Alpha One", "latitude": 54.10, "longitude": 8.00, "depth_m": 1.0},
            {"name": "Insel", "callsign": "Bravo", "latitude": 54.50, "longitude": 8.60, "depth_m": 2.0},
            {"name": "Watt", "callsign": "Charlie", "latitude": 53.90, "longitude": 8.90, "depth_m": 1.5},
            {"name": "Unplaced"}
        ]"#,
    );
    write(
        &root.join("fleet").join("vessels.json"),
        r#"[
            {"name": "Cruiser", "class": "28m", "speed_knots": 24.0, "draught_m": 1.5, "amount": 2,
             "tools": {"firefighting": true, "pumping": true, "second_craft": true,
                       "first_aid": true, "board_hospital": true, "towing": 1.0}},
            {"name": "Launch", "class": "10m", "speed_knots": 18.0, "draught_m": 0.8, "amount": 3,
             "tools": {"firefighting": true, "first_aid": true, "towing": 0.3}}
        ]"#,
    );

    write(
        &root.join("tides").join("levels.json"),
        r#"[
            {"number": 1, "latitude": 54.10, "longitude": 8.00, "water": "NORTH_SEA"},
            {"number": 2, "latitude": 54.50, "longitude": 8.60, "water": "NORTH_SEA"},
            {"number": 9, "latitude": 54.40, "longitude": 13.00, "water": "BALTIC_SEA"}
        ]"#,
    );
    write(
        &root.join("tides").join("north_sea").join("1.csv"),
        "timestamp,level\n\
         2024-01-01|00:00,400\n\
         2024-01-01|01:00,380\n\
         2024-01-01|02:00,300\n\
         2024-01-01|03:00,420\n",
    );
    write(
        &root.join("tides").join("north_sea").join("2.csv"),
        "timestamp,level\n\
         2024-01-01|00:00,500\n\
         2024-01-01|01:00,250\n\
         2024-01-01|02:00,\n\
         2024-01-01|03:00,450\n",
    );

    write(
        &root.join("geo").join("northern_sea").join(format!("{}_{}.csv", ZONES, SEED)),
        "lat,lon\n54.20,8.10\n54.25,8.20\n54.40,8.50\n54.00,8.70\n",
    );
    dir
}

fn config(variant: ModelVariant) -> PlannerConfig {
    let mut config = PlannerConfig::new(SEED, ZONES, Water::NorthSea, variant)
        .with_clusters(2)
        .with_policy(CoveragePolicy::Penalized { penalty: 1000.0 });
    config.generator.tow_amount = 2;
    config
}

#[test]
fn test_best_tidal_run_end_to_end() {
    let dir = data_dir();
    let layout = DataLayout::new(dir.path());
    let planner = Planner::new(layout.clone(), config(ModelVariant::BestTidal));

    let plan = planner.run().unwrap();
    let record = &plan.record;

    assert_eq!(record.status, "OPTIMAL");
    assert_eq!(record.number_of_zones, ZONES);
    assert!(record.cluster_count >= 1 && record.cluster_count <= 2);
    assert_eq!(plan.scenario.zone_count(), record.cluster_count);
    assert!(record.result >= 0.0);
    assert!(record.runtime >= record.solvetime);

    // stations without coordinates never make it into the scenario
    assert_eq!(plan.scenario.station_count(), 3);
    for (station, vessel) in plan.assignment.iter() {
        assert!(plan.scenario.station(station).is_ok());
        assert!(plan.scenario.vessel(vessel).is_ok());
    }

    // with the penalty far above any travel time, the optimum leaves
    // nothing unserved that a vessel could serve; if everything is
    // served the evaluator must agree with the solver
    if let Some(compare) = record.compare_val {
        assert_eq!(record.unfulfilled_count, 0);
        assert!((compare - record.result).abs() < 1e-6 * record.result.max(1.0));
    }

    assert!(ShareStore::new(layout.share_root()).is_cached(Water::NorthSea));
}

#[test]
fn test_second_run_reuses_cached_shares() {
    let dir = data_dir();
    let layout = DataLayout::new(dir.path());
    let planner = Planner::new(layout.clone(), config(ModelVariant::BestTidal));

    let first = planner.run().unwrap();

    // neither fleet nor gauges are read once shares are cached
    fs::remove_dir_all(dir.path().join("fleet")).unwrap();
    fs::remove_dir_all(dir.path().join("tides")).unwrap();

    let second = planner.run().unwrap();
    assert_eq!(first.record.status, second.record.status);
    assert_eq!(first.assignment.len(), second.assignment.len());
    let scale = first.record.result.abs().max(1.0);
    assert!((first.record.result - second.record.result).abs() < 1e-6 * scale);
}

#[test]
fn test_every_variant_appends_a_record() {
    let dir = data_dir();
    let layout = DataLayout::new(dir.path());
    let results = dir.path().join("results").join("runs.jsonl");

    let variants = [
        ModelVariant::ManyZones,
        ModelVariant::BetterTidal,
        ModelVariant::BestTidal,
    ];
    for variant in variants {
        let plan = Planner::new(layout.clone(), config(variant)).run().unwrap();
        assert_eq!(plan.record.solver_type, variant);
        append_run_record(&results, &plan.record).unwrap();
    }

    let records = read_run_records(&results).unwrap();
    assert_eq!(records.len(), 3);
    for (record, variant) in records.iter().zip(variants) {
        assert_eq!(record.solver_type, variant);
        assert_eq!(record.seed, SEED);
        assert_eq!(record.water, Water::NorthSea);
    }
}

#[test]
fn test_missing_fleet_without_cache_fails() {
    let dir = data_dir();
    fs::remove_file(dir.path().join("fleet").join("vessels.json")).unwrap();

    let planner = Planner::new(DataLayout::new(dir.path()), config(ModelVariant::BestTidal));
    assert!(matches!(planner.run(), Err(PlannerError::Io(_))));
}

#[test]
fn test_corrupt_cache_fails_loudly() {
    let dir = data_dir();
    let share_dir = dir.path().join("shares").join("north_sea");
    for file in ["shares.json", "stations.json", "vessels.json"] {
        write(&share_dir.join(file), "{ not json");
    }

    let planner = Planner::new(DataLayout::new(dir.path()), config(ModelVariant::BestTidal));
    assert!(matches!(planner.run(), Err(PlannerError::Tidal(_))));
}

/// Solves to optimality, then reports the point as if the limit had fired
struct StoppedEarly(MicroLpSolver);

impl Solver for StoppedEarly {
    fn name(&self) -> &str {
        "stopped-early"
    }

    fn solve(&self, program: &IntegerProgram) -> coverage_model::Result<SolveOutcome> {
        let mut outcome = self.0.solve(program)?;
        outcome.status = SolveStatus::TimeLimit;
        Ok(outcome)
    }
}

#[test]
fn test_time_limited_solve_still_yields_assignment() {
    let dir = data_dir();
    let planner = Planner::new(DataLayout::new(dir.path()), config(ModelVariant::BestTidal));
    let artifacts = planner.share_artifacts().unwrap();

    let optimal = planner.run_with(&artifacts, &MicroLpSolver::default()).unwrap();
    let stopped = planner
        .run_with(&artifacts, &StoppedEarly(MicroLpSolver::default()))
        .unwrap();

    assert_eq!(stopped.record.status, "TIME_LIMIT");
    assert_eq!(stopped.record.result, NO_RESULT);
    assert!(stopped.outcome.has_solution());
    assert!(!stopped.assignment.is_empty());
    assert_eq!(stopped.assignment.len(), optimal.assignment.len());
    // the best point is evaluated, not an empty assignment
    assert_eq!(stopped.record.compare_val.is_some(), optimal.record.compare_val.is_some());
    assert_eq!(stopped.record.unfulfilled_count, optimal.record.unfulfilled_count);
}

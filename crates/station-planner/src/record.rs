//! Run records and solution reports
//!
//! A run appends one JSON line to the results file. The optional solution
//! report is a pretty-printed document listing the chosen vessel type per
//! station.

use crate::{PlannerConfig, Result};
use chrono::{DateTime, Utc};
use coverage_model::{Assignment, Evaluation, ModelVariant, SolveOutcome};
use rescue_scenario::{Scenario, StationId, VesselId, Water};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Reported as `result` when the solve did not end optimal
pub const NO_RESULT: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub solver_type: ModelVariant,
    pub seed: u64,
    pub water: Water,
    /// Zones requested before clustering
    pub number_of_zones: usize,
    /// Zones the model was built on
    pub cluster_count: usize,
    /// Wall time from clustering to the end of the solve, in seconds
    pub runtime: f64,
    /// Engine time, in seconds
    pub solvetime: f64,
    pub status: String,
    pub result: f64,
    /// Evaluator objective; `None` when something stayed unserved
    pub compare_val: Option<f64>,
    pub unfulfilled_mass: f64,
    pub unfulfilled_count: u64,
    pub unfulfilled_weight: f64,
    pub finished_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new(
        config: &PlannerConfig,
        cluster_count: usize,
        runtime: f64,
        outcome: &SolveOutcome,
        evaluation: &Evaluation,
    ) -> Self {
        let result = match outcome.objective {
            Some(objective) if outcome.is_optimal() => objective,
            _ => NO_RESULT,
        };
        let compare = evaluation.value();
        Self {
            solver_type: config.variant,
            seed: config.seed,
            water: config.water,
            number_of_zones: config.zones,
            cluster_count,
            runtime,
            solvetime: outcome.elapsed.as_secs_f64(),
            status: outcome.status.to_string(),
            result,
            compare_val: compare.is_finite().then_some(compare),
            unfulfilled_mass: evaluation.unfulfilled_mass,
            unfulfilled_count: evaluation.unfulfilled_count,
            unfulfilled_weight: evaluation.unfulfilled_weight,
            finished_at: Utc::now(),
        }
    }
}

/// Append `record` as one JSON line, creating parent directories
pub fn append_run_record(path: impl AsRef<Path>, record: &RunRecord) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, record)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!("Appended run record to {:?}", path);
    Ok(())
}

/// Every record of a results file; blank lines are ignored
pub fn read_run_records(path: impl AsRef<Path>) -> Result<Vec<RunRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationAssignment {
    pub station: StationId,
    pub station_name: String,
    pub callsign: String,
    pub vessel: VesselId,
    pub vessel_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionReport {
    pub variant: ModelVariant,
    pub status: String,
    pub objective: Option<f64>,
    pub evaluation: Evaluation,
    pub stations: Vec<StationAssignment>,
}

impl SolutionReport {
    pub fn new(
        scenario: &Scenario,
        variant: ModelVariant,
        outcome: &SolveOutcome,
        assignment: &Assignment,
        evaluation: Evaluation,
    ) -> Result<Self> {
        let mut stations = Vec::with_capacity(assignment.len());
        for (station, vessel) in assignment.iter() {
            let st = scenario.station(station)?;
            let vt = scenario.vessel(vessel)?;
            stations.push(StationAssignment {
                station,
                station_name: st.name.clone(),
                callsign: st.callsign.clone(),
                vessel,
                vessel_name: vt.name.clone(),
            });
        }
        Ok(Self {
            variant,
            status: outcome.status.to_string(),
            objective: outcome.objective,
            evaluation,
            stations,
        })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Writing solution to {:?}", path);
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

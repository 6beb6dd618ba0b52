//! Rescue Vessel Station Planner
//!
//! Runs one planning experiment end to end: tidal shares are loaded (or
//! scanned from gauge series and cached), a scenario is assembled around
//! the fleet, zones are clustered, a coverage model is built and solved,
//! and the resulting assignment is re-evaluated independently.
//!
//! # Pipeline
//!
//! | Stage        | Input                          | Output                     |
//! |--------------|--------------------------------|----------------------------|
//! | Shares       | fleet files, gauge series      | joint shares (cached)      |
//! | Scenario     | seed, zone file or raster      | allowances, incidents      |
//! | Consolidate  | joint shares, allowances       | station thresholds         |
//! | Cluster      | zones, cluster count           | reduced zones              |
//! | Solve        | variant, policy, time limit    | station → vessel type      |
//! | Evaluate     | assignment, joint shares       | comparison objective       |
//!
//! # Data directory
//!
//! ```text
//! <data>/fleet/stations.json        raw station list
//! <data>/fleet/vessels.json         raw vessel class list
//! <data>/tides/levels.json          gauge catalogue
//! <data>/tides/<water>/<n>.csv      gauge series
//! <data>/shares/<water>/*.json      cached share artifacts
//! <data>/geo/<folder>/<n>_<seed>.csv  zone centroids
//! ```

use coverage_model::ModelError;
use rescue_scenario::{ScenarioError, Water};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tidal_shares::TidalError;

pub mod loader;
pub mod pipeline;
pub mod record;

pub use pipeline::{PlanOutcome, Planner, PlannerConfig};
pub use record::{RunRecord, SolutionReport, StationAssignment};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "RESCUE_DATA_DIR";

pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("Share error: {0}")]
    Tidal(#[from] TidalError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("No usable {0} in fleet data")]
    EmptyFleet(&'static str),
}

pub type Result<T> = std::result::Result<T, PlannerError>;

/// File locations below one data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `RESCUE_DATA_DIR`, or `data` below the working directory
    pub fn from_env() -> Self {
        Self::new(std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fleet_stations(&self) -> PathBuf {
        self.root.join("fleet").join("stations.json")
    }

    pub fn fleet_vessels(&self) -> PathBuf {
        self.root.join("fleet").join("vessels.json")
    }

    pub fn gauge_root(&self) -> PathBuf {
        self.root.join("tides")
    }

    pub fn share_root(&self) -> PathBuf {
        self.root.join("shares")
    }

    pub fn zone_file(&self, water: Water, zones: usize, seed: u64) -> PathBuf {
        rescue_scenario::zones::zone_file_path(&self.root, water, zones, seed)
    }
}

//! Tidal Share Library
//!
//! Turns per-minute water levels at reference gauges into the fraction of
//! time each combination of (station, fitting vessel types) holds, and
//! reduces that joint distribution to per-pair and per-station scalars.
//!
//! # Pipeline
//!
//! ```text
//! gauge catalogue + series ──► scan (IDW per station, draught test)
//!                                  │
//!                                  ▼
//!                             JointShares ──► consolidate ──► ConsolidatedShares
//!                                  │
//!                                  ▼
//!                  <root>/<water>/{shares,stations,vessels}.json
//! ```
//!
//! Levels are in centimetres, depths and draughts in metres.

use rescue_scenario::{ScenarioError, StationId, VesselId, Water};
use thiserror::Error;

pub mod consolidate;
pub mod gauge;
pub mod progress;
pub mod scan;
pub mod shares;
pub mod store;

pub use consolidate::ConsolidatedShares;
pub use gauge::{Gauge, GaugeFrame, LockstepReader};
pub use progress::{LogProgress, NoProgress, Progress};
pub use scan::{ShareScanner, GAUGES_PER_STATION};
pub use shares::{Combination, JointShares};
pub use store::{ShareArtifacts, ShareStore};

/// Tolerance for the joint fractions summing to one
pub const SHARE_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug)]
pub enum TidalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("No gauge series found for {0}")]
    NoGauges(Water),
    #[error("No station open at row {row}")]
    NoStationOpen { row: u64 },
    #[error("Gauge {gauge} is at {found} on row {row}, expected {expected}")]
    MisalignedSeries {
        gauge: u32,
        row: u64,
        expected: String,
        found: String,
    },
    #[error("Gauge {gauge} line {line}: {reason}")]
    BadRow {
        gauge: u32,
        line: u64,
        reason: String,
    },
    #[error("Share references unknown station {0}")]
    DanglingStation(StationId),
    #[error("Share references unknown vessel type {0}")]
    DanglingVessel(VesselId),
    #[error("Invalid share distribution: {0}")]
    InvalidShares(String),
}

pub type Result<T> = std::result::Result<T, TidalError>;

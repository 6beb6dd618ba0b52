//! Rescue Scenario Library
//!
//! Vessel types, stations, incident zones and incident types for one
//! coastal planning scenario, the relations between them, and the tools
//! that assemble a scenario: tagged-record persistence, zone input,
//! procedural generation and zone clustering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod cluster;
pub mod codec;
pub mod entities;
pub mod generate;
pub mod ids;
pub mod registry;
pub mod zones;

pub use cluster::cluster_zones;
pub use codec::{Record, ShareRecord};
pub use entities::{Capability, IncidentType, Station, VesselType, Zone};
pub use generate::{GeneratorConfig, ScenarioGenerator};
pub use ids::{IdIssuer, IncidentId, StationId, VesselId, ZoneId};
pub use registry::Scenario;

pub use coastal_geo::GeoPoint;

/// Longitude separating North Sea from Baltic Sea stations (Kiel Canal)
pub const WATER_CUTOFF_LONGITUDE: f64 = 9.5721;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Geometry error: {0}")]
    Geo(#[from] coastal_geo::GeoError),
    #[error("Duplicate identifier: {0}")]
    DuplicateId(String),
    #[error("Unknown vessel type: {0}")]
    UnknownVessel(VesselId),
    #[error("Unknown station: {0}")]
    UnknownStation(StationId),
    #[error("Unknown zone: {0}")]
    UnknownZone(ZoneId),
    #[error("Unknown incident type: {0}")]
    UnknownIncident(IncidentId),
    #[error("Invalid vessel type {id}: {reason}")]
    InvalidVessel { id: VesselId, reason: String },
    #[error("Invalid station {id}: {reason}")]
    InvalidStation { id: StationId, reason: String },
    #[error("Invalid incident type {id}: {reason}")]
    InvalidIncident { id: IncidentId, reason: String },
    #[error("Incident type {0} has no permitted vessel type")]
    NoPermittedVessel(IncidentId),
    #[error("Station {0} has no allowed vessel type")]
    StationWithoutVessel(StationId),
    #[error("Incident type {incident} has no probability for zone {zone}")]
    MissingProbability { incident: IncidentId, zone: ZoneId },
    #[error("Record decode error: {0}")]
    Codec(String),
    #[error("Zone file line {line}: {reason}")]
    ZoneFile { line: usize, reason: String },
    #[error("Clustering failed: {0}")]
    Clustering(String),
    #[error("Unknown water body: {0}")]
    UnknownWater(String),
    #[error("Cannot generate scenario: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Water body a scenario covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Water {
    NorthSea,
    BalticSea,
    All,
}

impl Water {
    /// Lower-case name used for artifact directories
    pub fn dir_name(&self) -> &'static str {
        match self {
            Water::NorthSea => "north_sea",
            Water::BalticSea => "baltic_sea",
            Water::All => "all",
        }
    }

    /// Folder holding the generated zone coordinate files
    pub fn zone_folder(&self) -> &'static str {
        match self {
            Water::NorthSea => "northern_sea",
            Water::BalticSea => "eastern_sea",
            Water::All => "combined",
        }
    }

    /// Whether a station at `longitude` belongs to this water body
    pub fn contains_longitude(&self, longitude: f64) -> bool {
        match self {
            Water::NorthSea => longitude < WATER_CUTOFF_LONGITUDE,
            Water::BalticSea => longitude >= WATER_CUTOFF_LONGITUDE,
            Water::All => true,
        }
    }
}

impl fmt::Display for Water {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Water {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "NORTHSEA" | "NORTHERNSEA" | "NORDSEE" => Ok(Water::NorthSea),
            "BALTICSEA" | "OSTSEE" | "EASTERNSEA" => Ok(Water::BalticSea),
            "ALL" | "COMBINED" => Ok(Water::All),
            _ => Err(ScenarioError::UnknownWater(s.to_string())),
        }
    }
}

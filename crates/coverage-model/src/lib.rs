//! Coverage Model Library
//!
//! Builds the integer program that stations vessel types at harbours so
//! that expected, incident-weighted response time is minimal, solves it
//! through a [`Solver`], and recomputes the objective of any assignment by
//! direct enumeration.
//!
//! # Variables
//!
//! ```text
//! x[v, s]              1 iff vessel type v is stationed at s
//! y[t, s, v, z, i]     1 iff (s, v) responds to incident i in zone z in state t
//! ```
//!
//! # Variants
//!
//! | Variant       | Availability states                                  |
//! |---------------|------------------------------------------------------|
//! | `ManyZones`   | intervals between station closed-time thresholds     |
//! | `BetterTidal` | intervals between per-pair closed fractions          |
//! | `BestTidal`   | one state per observed joint combination             |

use rescue_scenario::{ScenarioError, StationId, VesselId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tidal_shares::TidalError;

pub mod builder;
pub mod evaluator;
pub mod program;
pub mod solver;

pub use builder::{
    AvailabilityState, BestTidalBuilder, BetterTidalBuilder, CoverageBuilder, CoverageModel,
    CoveragePolicy, ManyZonesBuilder, ResponseVar, BINARY_CUTOFF,
};
pub use evaluator::{Evaluation, ObjectiveEvaluator};
pub use program::{IntegerProgram, Sense, VarId};
pub use solver::{
    solve_model, MicroLpSolver, SolveOutcome, SolveStatus, Solver, SolverConfig, DEFAULT_TIME_LIMIT,
};

/// Tolerance used when checking constraint satisfaction of solver output
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("Share error: {0}")]
    Tidal(#[from] TidalError),
    #[error("Solver supports exactly one thread, {0} requested")]
    UnsupportedThreads(usize),
    #[error("Invalid penalty {0}, must be positive and finite")]
    InvalidPenalty(f64),
    #[error("Unknown model variant: {0}")]
    UnknownVariant(String),
    #[error("Solver failed: {0}")]
    Solver(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Which availability discretization a model uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelVariant {
    ManyZones,
    BetterTidal,
    BestTidal,
}

impl ModelVariant {
    pub fn name(&self) -> &'static str {
        match self {
            ModelVariant::ManyZones => "MANY_ZONES",
            ModelVariant::BetterTidal => "BETTER_TIDAL",
            ModelVariant::BestTidal => "BEST_TIDAL",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelVariant {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        let normalized = normalized.strip_prefix("GUROBI_").unwrap_or(&normalized);
        match normalized {
            "MANY_ZONES" => Ok(ModelVariant::ManyZones),
            "BETTER_TIDAL" => Ok(ModelVariant::BetterTidal),
            "BEST_TIDAL" => Ok(ModelVariant::BestTidal),
            _ => Err(ModelError::UnknownVariant(s.to_string())),
        }
    }
}

/// Station → vessel type assignment; stations not listed are unusable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment(BTreeMap<StationId, VesselId>);

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, station: StationId, vessel: VesselId) -> Option<VesselId> {
        self.0.insert(station, vessel)
    }

    pub fn vessel_at(&self, station: StationId) -> Option<VesselId> {
        self.0.get(&station).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StationId, VesselId)> + '_ {
        self.0.iter().map(|(s, v)| (*s, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of stations each vessel type occupies
    pub fn usage(&self) -> BTreeMap<VesselId, u32> {
        let mut counts = BTreeMap::new();
        for v in self.0.values() {
            *counts.entry(*v).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<(StationId, VesselId)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (StationId, VesselId)>>(iter: I) -> Self {
        Assignment(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_names() {
        assert_eq!("GUROBI_BEST_TIDAL".parse::<ModelVariant>().unwrap(), ModelVariant::BestTidal);
        assert_eq!("many-zones".parse::<ModelVariant>().unwrap(), ModelVariant::ManyZones);
        assert!("fastest".parse::<ModelVariant>().is_err());
        assert_eq!(
            serde_json::to_string(&ModelVariant::BetterTidal).unwrap(),
            "\"BETTER_TIDAL\""
        );
    }

    #[test]
    fn test_assignment_usage() {
        let a: Assignment = vec![
            (StationId(0), VesselId(1)),
            (StationId(1), VesselId(1)),
            (StationId(2), VesselId(0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(a.usage().get(&VesselId(1)), Some(&2));
        assert_eq!(a.vessel_at(StationId(3)), None);
    }
}

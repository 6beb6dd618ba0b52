//! Consolidation of joint shares into scalars
//!
//! Per allowed (station, vessel) pair: the fraction of time it is usable.
//! Per station: a closed-time threshold that weighs each pair's usable
//! fraction by the fleet size of its vessel type.

use crate::shares::JointShares;
use crate::Result;
use rescue_scenario::{Scenario, StationId, VesselId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsolidatedShares {
    usable: BTreeMap<(StationId, VesselId), f64>,
    thresholds: BTreeMap<StationId, f64>,
}

impl ConsolidatedShares {
    /// Consolidate over the scenario's allowed pairs
    ///
    /// Pairs that are never open get a usable fraction of zero; stations
    /// that are never open get the threshold one.
    pub fn from_joint(joint: &JointShares, scenario: &Scenario) -> Self {
        let mut usable: BTreeMap<(StationId, VesselId), f64> =
            scenario.allowed_pairs().map(|pair| (pair, 0.0)).collect();
        for (combination, fraction) in joint.iter() {
            for pair in combination.open_pairs() {
                if let Some(u) = usable.get_mut(&pair) {
                    *u += fraction;
                }
            }
        }

        let total_fleet = scenario.total_fleet() as f64;
        let mut weighted: BTreeMap<StationId, f64> = BTreeMap::new();
        for (&(station, vessel), &u) in &usable {
            let fleet = scenario
                .vessel(vessel)
                .map(|v| f64::from(v.fleet_size))
                .unwrap_or(0.0);
            *weighted.entry(station).or_insert(0.0) += u * fleet;
        }

        let thresholds = scenario
            .stations()
            .map(|s| {
                let threshold = match weighted.get(&s.id) {
                    Some(w) if *w > 0.0 && total_fleet > 0.0 => (1.0 - w / total_fleet).clamp(0.0, 1.0),
                    _ => 1.0,
                };
                (s.id, threshold)
            })
            .collect();

        debug!("Consolidated {} station/vessel pairs", usable.len());
        Self { usable, thresholds }
    }

    /// Fraction of time the pair is usable, clamped to [0, 1]; zero if unknown
    pub fn usable(&self, station: StationId, vessel: VesselId) -> f64 {
        self.usable
            .get(&(station, vessel))
            .map(|u| u.clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    /// Fraction of time the pair must be assumed closed
    pub fn closed_fraction(&self, station: StationId, vessel: VesselId) -> f64 {
        1.0 - self.usable(station, vessel)
    }

    pub fn threshold(&self, station: StationId) -> f64 {
        self.thresholds.get(&station).copied().unwrap_or(1.0)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (StationId, VesselId)> + '_ {
        self.usable.keys().copied()
    }

    /// Distinct closed fractions over all pairs, ascending
    pub fn closed_fractions(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self
            .pairs()
            .map(|(s, v)| self.closed_fraction(s, v))
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        values
    }

    pub fn stations(&self) -> BTreeSet<StationId> {
        self.thresholds.keys().copied().collect()
    }

    /// Store each station's threshold as its minimum availability
    pub fn apply_thresholds(&self, scenario: &mut Scenario) -> Result<()> {
        for (&station, &threshold) in &self.thresholds {
            scenario.set_min_availability(station, threshold)?;
        }
        Ok(())
    }
}

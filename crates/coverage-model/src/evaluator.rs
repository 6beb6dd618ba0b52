//! Objective evaluator
//!
//! Recomputes the expected weighted response time of a concrete
//! assignment by enumerating every joint combination, zone and incident.
//! No solver is involved, so the result serves as ground truth for any
//! model variant.

use crate::Assignment;
use rescue_scenario::{IncidentType, Scenario, Zone};
use serde::{Deserialize, Serialize};
use tidal_shares::{Combination, JointShares};
use tracing::{debug, info};

/// Detailed evaluation result
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    /// Expected weighted response time over the served triples, in hours
    pub objective: f64,
    /// Summed share fractions of triples nobody could serve
    pub unfulfilled_mass: f64,
    /// Number of (combination, zone, incident) triples nobody could serve
    pub unfulfilled_count: u64,
    /// Summed `weight × probability` of those triples
    pub unfulfilled_weight: f64,
}

impl Evaluation {
    pub fn is_fulfilled(&self) -> bool {
        self.unfulfilled_count == 0
    }

    /// The objective, or infinity if anything is left unserved
    pub fn value(&self) -> f64 {
        if self.is_fulfilled() {
            self.objective
        } else {
            f64::INFINITY
        }
    }
}

pub struct ObjectiveEvaluator<'a> {
    scenario: &'a Scenario,
    joint: &'a JointShares,
}

impl<'a> ObjectiveEvaluator<'a> {
    pub fn new(scenario: &'a Scenario, joint: &'a JointShares) -> Self {
        Self { scenario, joint }
    }

    /// Fastest eligible response time in one combination, in hours
    fn fastest(
        &self,
        assignment: &Assignment,
        combination: &Combination,
        zone: &Zone,
        incident: &IncidentType,
    ) -> Option<f64> {
        combination
            .entries()
            .iter()
            .filter_map(|(station, fitting)| {
                let vessel = assignment.vessel_at(*station)?;
                if fitting.binary_search(&vessel).is_err()
                    || !incident.permits(vessel)
                    || !self.scenario.can_reach(zone.id, *station, vessel)
                {
                    return None;
                }
                let st = self.scenario.station(*station).ok()?;
                let vt = self.scenario.vessel(vessel).ok()?;
                Some(vt.travel_time_h(self.scenario.distance_nm(&st.position, &zone.position)))
            })
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn evaluate(&self, assignment: &Assignment) -> Evaluation {
        let mut eval = Evaluation::default();
        let total = self.joint.len();

        for (index, (combination, fraction)) in self.joint.iter().enumerate() {
            for zone in self.scenario.zones() {
                for incident in self.scenario.incidents() {
                    let p = incident.probability(zone.id);
                    if p <= 0.0 {
                        continue;
                    }
                    match self.fastest(assignment, combination, zone, incident) {
                        Some(hours) => eval.objective += hours * fraction * incident.weight * p,
                        None => {
                            eval.unfulfilled_mass += fraction;
                            eval.unfulfilled_count += 1;
                            eval.unfulfilled_weight += incident.weight * p;
                        }
                    }
                }
            }
            debug!(
                "Evaluated combination {}/{}, {} unfulfilled so far",
                index + 1,
                total,
                eval.unfulfilled_count
            );
        }

        info!(
            "Unfulfilled: {} ({} incidents) with weight {}",
            eval.unfulfilled_mass, eval.unfulfilled_count, eval.unfulfilled_weight
        );
        eval
    }

    /// Objective, infinite when any triple is unserved
    pub fn value(&self, assignment: &Assignment) -> f64 {
        self.evaluate(assignment).value()
    }
}

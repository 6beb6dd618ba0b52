//! Coverage model builders
//!
//! The three variants differ only in how they discretize availability
//! into weighted states, each with its own set of open (station, vessel)
//! pairs. Variables and constraints are then assembled the same way:
//!
//! - fleet cap: `Σ_s x[v, s] <= fleet(v)`
//! - one vessel per station: `Σ_v x[v, s] <= 1`
//! - consistency: `Σ y[.., s, v, ..] <= n · x[v, s]`
//! - coverage: `Σ y[t, .., z, i] = 1` per state, zone and incident with probability > 0

use crate::program::{IntegerProgram, Sense, VarId};
use crate::{Assignment, ModelError, ModelVariant, Result};
use rescue_scenario::{IncidentId, Scenario, StationId, VesselId, ZoneId};
use std::collections::{BTreeMap, BTreeSet};
use tidal_shares::{ConsolidatedShares, JointShares};
use tracing::{debug, info, warn};

/// Value above which a binary in a solver result counts as set
pub const BINARY_CUTOFF: f64 = 0.5;

/// What happens to a (state, zone, incident) triple no pair can serve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CoveragePolicy {
    /// Exactly one responder per triple; an uncoverable triple makes the model infeasible
    #[default]
    Strict,
    /// One slack binary per triple, charged `penalty` hours per unit of weighted probability
    Penalized { penalty: f64 },
}

impl CoveragePolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            CoveragePolicy::Penalized { penalty } if !(penalty.is_finite() && penalty > 0.0) => {
                Err(ModelError::InvalidPenalty(penalty))
            }
            _ => Ok(()),
        }
    }
}

/// One discretized availability state
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityState {
    /// Fraction of time the state represents
    pub weight: f64,
    /// Lower end of the threshold interval; zero for joint combinations
    pub lower_bound: f64,
    /// Allowed (station, vessel) pairs usable in this state
    pub open: BTreeSet<(StationId, VesselId)>,
}

impl AvailabilityState {
    pub fn is_open(&self, station: StationId, vessel: VesselId) -> bool {
        self.open.contains(&(station, vessel))
    }
}

/// A response variable and what it stands for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseVar {
    pub state: usize,
    pub station: StationId,
    pub vessel: VesselId,
    pub zone: ZoneId,
    pub incident: IncidentId,
    pub var: VarId,
}

#[derive(Debug, Clone)]
pub struct CoverageModel {
    pub variant: ModelVariant,
    pub policy: CoveragePolicy,
    pub program: IntegerProgram,
    pub states: Vec<AvailabilityState>,
    /// `x` variables by (vessel, station)
    pub assignment_vars: BTreeMap<(VesselId, StationId), VarId>,
    pub response_vars: Vec<ResponseVar>,
    /// Slack variables under [`CoveragePolicy::Penalized`]
    pub slack_vars: Vec<VarId>,
    /// Triples without any eligible response variable
    pub uncoverable: usize,
}

impl CoverageModel {
    /// Stations whose `x` variable is set in `values`
    pub fn extract_assignment(&self, values: &[f64]) -> Assignment {
        self.assignment_vars
            .iter()
            .filter(|(_, var)| values.get(var.index()).is_some_and(|x| *x > BINARY_CUTOFF))
            .map(|(&(vessel, station), _)| (station, vessel))
            .collect()
    }

    /// Total slack taken in `values`
    pub fn slack_used(&self, values: &[f64]) -> usize {
        self.slack_vars
            .iter()
            .filter(|var| values.get(var.index()).is_some_and(|x| *x > BINARY_CUTOFF))
            .count()
    }

    /// Whether a strict model can be handed to a solver at all
    pub fn is_trivially_infeasible(&self) -> bool {
        self.policy == CoveragePolicy::Strict && self.uncoverable > 0
    }
}

/// Intervals between consecutive distinct thresholds of `{0, 1} ∪ values`
pub fn threshold_intervals(values: impl IntoIterator<Item = f64>) -> Vec<(f64, f64)> {
    let mut points: Vec<f64> = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .map(|v| v.clamp(0.0, 1.0))
        .chain([0.0, 1.0])
        .collect();
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup();
    points.windows(2).map(|w| (w[0], w[1])).collect()
}

pub trait CoverageBuilder {
    fn variant(&self) -> ModelVariant;

    /// Weighted availability states over the scenario's allowed pairs
    fn states(&self, scenario: &Scenario) -> Result<Vec<AvailabilityState>>;

    fn build(&self, scenario: &Scenario, policy: CoveragePolicy) -> Result<CoverageModel> {
        policy.validate()?;
        let states = self.states(scenario)?;
        assemble(self.variant(), scenario, states, policy)
    }
}

/// Intervals between the stations' minimum-availability thresholds
///
/// A station opens, with every allowed vessel, in each interval whose
/// lower bound reaches its threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManyZonesBuilder;

impl CoverageBuilder for ManyZonesBuilder {
    fn variant(&self) -> ModelVariant {
        ModelVariant::ManyZones
    }

    fn states(&self, scenario: &Scenario) -> Result<Vec<AvailabilityState>> {
        let intervals = threshold_intervals(scenario.stations().map(|s| s.min_availability));
        Ok(intervals
            .into_iter()
            .map(|(lo, hi)| AvailabilityState {
                weight: hi - lo,
                lower_bound: lo,
                open: scenario
                    .allowed_pairs()
                    .filter(|(s, _)| {
                        scenario
                            .station(*s)
                            .map(|st| lo >= st.min_availability)
                            .unwrap_or(false)
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Intervals between the per-pair closed fractions
///
/// A pair opens in each interval whose lower bound reaches its closed
/// fraction. Extra thresholds refine the intervals further.
#[derive(Debug, Clone)]
pub struct BetterTidalBuilder<'a> {
    consolidated: &'a ConsolidatedShares,
    extra_thresholds: Vec<f64>,
}

impl<'a> BetterTidalBuilder<'a> {
    pub fn new(consolidated: &'a ConsolidatedShares) -> Self {
        Self {
            consolidated,
            extra_thresholds: Vec::new(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: impl IntoIterator<Item = f64>) -> Self {
        self.extra_thresholds.extend(thresholds);
        self
    }
}

impl CoverageBuilder for BetterTidalBuilder<'_> {
    fn variant(&self) -> ModelVariant {
        ModelVariant::BetterTidal
    }

    fn states(&self, scenario: &Scenario) -> Result<Vec<AvailabilityState>> {
        let intervals = threshold_intervals(
            self.consolidated
                .closed_fractions()
                .into_iter()
                .chain(self.extra_thresholds.iter().copied()),
        );
        Ok(intervals
            .into_iter()
            .map(|(lo, hi)| AvailabilityState {
                weight: hi - lo,
                lower_bound: lo,
                open: scenario
                    .allowed_pairs()
                    .filter(|&(s, v)| self.consolidated.closed_fraction(s, v) <= lo)
                    .collect(),
            })
            .collect())
    }
}

/// One state per joint combination, weighted by its observed fraction
#[derive(Debug, Clone, Copy)]
pub struct BestTidalBuilder<'a> {
    joint: &'a JointShares,
}

impl<'a> BestTidalBuilder<'a> {
    pub fn new(joint: &'a JointShares) -> Self {
        Self { joint }
    }
}

impl CoverageBuilder for BestTidalBuilder<'_> {
    fn variant(&self) -> ModelVariant {
        ModelVariant::BestTidal
    }

    fn states(&self, scenario: &Scenario) -> Result<Vec<AvailabilityState>> {
        Ok(self
            .joint
            .iter()
            .map(|(combination, fraction)| AvailabilityState {
                weight: fraction,
                lower_bound: 0.0,
                open: combination
                    .open_pairs()
                    .filter(|&(s, v)| scenario.is_allowed(s, v))
                    .collect(),
            })
            .collect())
    }
}

fn assemble(
    variant: ModelVariant,
    scenario: &Scenario,
    states: Vec<AvailabilityState>,
    policy: CoveragePolicy,
) -> Result<CoverageModel> {
    info!(
        "Building {} model: {} states, {} zones, {} incident types",
        variant,
        states.len(),
        scenario.zone_count(),
        scenario.incident_count()
    );
    let mut program = IntegerProgram::new();

    let mut assignment_vars = BTreeMap::new();
    for vessel in scenario.vessels() {
        for station in scenario.allowed_stations(vessel.id) {
            let var = program.add_binary(format!("x_{}_{}", vessel.id.get(), station.get()), 0.0);
            assignment_vars.insert((vessel.id, station), var);
        }
    }

    let mut response_vars = Vec::new();
    let mut slack_vars = Vec::new();
    let mut uncoverable = 0;
    let mut by_pair: BTreeMap<(StationId, VesselId), Vec<VarId>> = BTreeMap::new();

    for (t, state) in states.iter().enumerate() {
        for zone in scenario.zones() {
            for incident in scenario.incidents() {
                let p = incident.probability(zone.id);
                if p <= 0.0 {
                    continue;
                }
                let mut terms = Vec::new();
                for &(station, vessel) in &state.open {
                    if !incident.permits(vessel) || !scenario.can_reach(zone.id, station, vessel) {
                        continue;
                    }
                    let st = scenario.station(station)?;
                    let vt = scenario.vessel(vessel)?;
                    let hours = vt.travel_time_h(scenario.distance_nm(&zone.position, &st.position));
                    let cost = p * hours * incident.weight * state.weight;
                    let var = program.add_binary(
                        format!(
                            "y_{}_{}_{}_{}_{}",
                            station.get(),
                            t,
                            vessel.get(),
                            zone.id.get(),
                            incident.id.get()
                        ),
                        cost,
                    );
                    response_vars.push(ResponseVar {
                        state: t,
                        station,
                        vessel,
                        zone: zone.id,
                        incident: incident.id,
                        var,
                    });
                    by_pair.entry((station, vessel)).or_default().push(var);
                    terms.push((var, 1.0));
                }

                if terms.is_empty() {
                    uncoverable += 1;
                }
                if let CoveragePolicy::Penalized { penalty } = policy {
                    let slack = program.add_binary(
                        format!("u_{}_{}_{}", t, zone.id.get(), incident.id.get()),
                        penalty * p * incident.weight * state.weight,
                    );
                    slack_vars.push(slack);
                    terms.push((slack, 1.0));
                }
                program.add_constraint(
                    format!("incident_covered_{}_{}_{}", t, zone.id.get(), incident.id.get()),
                    terms,
                    Sense::Eq,
                    1.0,
                );
            }
        }
    }

    for vessel in scenario.vessels() {
        let terms: Vec<(VarId, f64)> = assignment_vars
            .iter()
            .filter(|((v, _), _)| *v == vessel.id)
            .map(|(_, var)| (*var, 1.0))
            .collect();
        program.add_constraint(
            format!("fleet_cap_{}", vessel.id.get()),
            terms,
            Sense::Le,
            f64::from(vessel.fleet_size),
        );
    }

    for station in scenario.stations() {
        let terms: Vec<(VarId, f64)> = scenario
            .allowed_vessels(station.id)
            .filter_map(|v| assignment_vars.get(&(v, station.id)))
            .map(|var| (*var, 1.0))
            .collect();
        program.add_constraint(
            format!("one_vessel_{}", station.id.get()),
            terms,
            Sense::Le,
            1.0,
        );
    }

    for (&(vessel, station), &x) in &assignment_vars {
        let ys = match by_pair.get(&(station, vessel)) {
            Some(ys) if !ys.is_empty() => ys,
            _ => continue,
        };
        let mut terms: Vec<(VarId, f64)> = ys.iter().map(|y| (*y, 1.0)).collect();
        terms.push((x, -(ys.len() as f64)));
        program.add_constraint(
            format!("assigned_if_used_{}_{}", station.get(), vessel.get()),
            terms,
            Sense::Le,
            0.0,
        );
    }

    if uncoverable > 0 {
        match policy {
            CoveragePolicy::Strict => warn!(
                "{} (state, zone, incident) triples have no eligible responder; the model is infeasible",
                uncoverable
            ),
            CoveragePolicy::Penalized { .. } => warn!(
                "{} (state, zone, incident) triples have no eligible responder and will be penalized",
                uncoverable
            ),
        }
    }
    debug!(
        "Model has {} variables ({} response) and {} constraints",
        program.var_count(),
        response_vars.len(),
        program.constraint_count()
    );

    Ok(CoverageModel {
        variant,
        policy,
        program,
        states,
        assignment_vars,
        response_vars,
        slack_vars,
        uncoverable,
    })
}

//! Scenario generators for property-based testing
//!
//! Every strategy yields values that pass the scenario's own validation,
//! so properties can focus on model behaviour instead of input hygiene.

use coastal_geo::GeoPoint;
use proptest::prelude::*;
use rescue_scenario::{
    IncidentId, IncidentType, Scenario, Station, StationId, VesselId, VesselType, Zone, ZoneId,
};
use std::collections::BTreeMap;
use tidal_shares::{Combination, JointShares};

// ============================================================================
// Geographic Generators
// ============================================================================

/// Latitude inside the German Bight and western Baltic
pub fn bight_latitude() -> impl Strategy<Value = f64> {
    53.3f64..55.2
}

/// Longitude from the Ems to Fehmarn
pub fn bight_longitude() -> impl Strategy<Value = f64> {
    6.5f64..11.5
}

pub fn coastal_point() -> impl Strategy<Value = GeoPoint> {
    (bight_latitude(), bight_longitude()).prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
}

/// Between one and `max` positions
pub fn point_cloud(max: usize) -> impl Strategy<Value = Vec<GeoPoint>> {
    prop::collection::vec(coastal_point(), 1..=max.max(1))
}

// ============================================================================
// Ratio Generators
// ============================================================================

/// Fraction in [0, 1]
pub fn ratio() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

/// Up to `max` extra availability thresholds
pub fn thresholds(max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(ratio(), 0..=max)
}

// ============================================================================
// Fleet Generators
// ============================================================================

pub fn fleet_size() -> impl Strategy<Value = u32> {
    1u32..=3
}

pub fn speed_knots() -> impl Strategy<Value = f64> {
    8.0f64..35.0
}

pub fn draught_m() -> impl Strategy<Value = f64> {
    0.5f64..3.5
}

// ============================================================================
// Scenario Generators
// ============================================================================

/// Upper bounds on the entity counts of a generated scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioShape {
    pub max_stations: usize,
    pub max_vessels: usize,
    pub max_zones: usize,
    pub max_incidents: usize,
}

impl Default for ScenarioShape {
    fn default() -> Self {
        Self {
            max_stations: 3,
            max_vessels: 2,
            max_zones: 3,
            max_incidents: 2,
        }
    }
}

/// A validated scenario with unbounded reach and universally permitted incidents
///
/// Allowances are random; a station left without one receives the first
/// vessel type. Every incident has a positive probability in every zone.
pub fn scenario(shape: ScenarioShape) -> impl Strategy<Value = Scenario> {
    let ScenarioShape {
        max_stations,
        max_vessels,
        max_zones,
        max_incidents,
    } = shape;
    let max_stations = max_stations.max(1);
    let max_vessels = max_vessels.max(1);
    let max_zones = max_zones.max(1);
    let max_incidents = max_incidents.max(1);

    (
        point_cloud(max_stations),
        prop::collection::vec((fleet_size(), speed_knots()), 1..=max_vessels),
        point_cloud(max_zones),
        prop::collection::vec(0.5f64..5.0, 1..=max_incidents),
        prop::collection::vec(any::<bool>(), max_stations * max_vessels),
        prop::collection::vec(0.01f64..=1.0, max_zones * max_incidents),
    )
        .prop_filter_map(
            "scenario must validate",
            move |(stations, vessels, zones, weights, allow, probabilities)| {
                build_scenario(
                    &stations,
                    &vessels,
                    &zones,
                    &weights,
                    |s, v| allow[s * max_vessels + v],
                    |i, z| probabilities[i * max_zones + z],
                )
                .ok()
            },
        )
}

fn build_scenario(
    stations: &[GeoPoint],
    vessels: &[(u32, f64)],
    zones: &[GeoPoint],
    weights: &[f64],
    allowed: impl Fn(usize, usize) -> bool,
    probability: impl Fn(usize, usize) -> f64,
) -> rescue_scenario::Result<Scenario> {
    let mut sc = Scenario::new();
    for (v, &(fleet, speed)) in vessels.iter().enumerate() {
        sc.insert_vessel(VesselType::new(VesselId(v as u32), fleet, speed))?;
    }
    for (s, &position) in stations.iter().enumerate() {
        sc.insert_station(Station::new(StationId(s as u32), position))?;
        for v in 0..vessels.len() {
            if allowed(s, v) {
                sc.allow(StationId(s as u32), VesselId(v as u32))?;
            }
        }
    }
    sc.ensure_station_allowances(VesselId(0))?;
    for (z, &position) in zones.iter().enumerate() {
        sc.insert_zone(Zone::new(ZoneId(z as u32), position))?;
    }
    for (i, &weight) in weights.iter().enumerate() {
        let mut incident = IncidentType::new(IncidentId(i as u32), weight);
        for v in 0..vessels.len() {
            incident = incident.permit(VesselId(v as u32));
        }
        for z in 0..zones.len() {
            incident = incident.with_probability(ZoneId(z as u32), probability(i, z));
        }
        sc.insert_incident(incident)?;
    }
    sc.compute_reachability();
    sc.validate()?;
    Ok(sc)
}

// ============================================================================
// Share Generators
// ============================================================================

/// Joint distribution over up to `max_combinations` observed combinations
///
/// Each combination opens a random subset of (station, vessel) cells,
/// never none at all, so every state has at least one open station.
pub fn joint_shares(scenario: &Scenario, max_combinations: usize) -> impl Strategy<Value = JointShares> {
    let stations: Vec<StationId> = scenario.stations().map(|s| s.id).collect();
    let vessels: Vec<VesselId> = scenario.vessels().map(|v| v.id).collect();
    let cells = stations.len() * vessels.len();

    prop::collection::vec(
        (prop::collection::vec(any::<bool>(), cells), 1u64..20),
        1..=max_combinations.max(1),
    )
    .prop_filter_map("shares need a station and a vessel", move |rows| {
        let first = *stations.first()?;
        let mut counts: BTreeMap<Combination, u64> = BTreeMap::new();
        for (mask, count) in rows {
            let mut entries: Vec<(StationId, Vec<VesselId>)> = stations
                .iter()
                .enumerate()
                .map(|(s, station)| {
                    let open = vessels
                        .iter()
                        .enumerate()
                        .filter(|(v, _)| mask[s * vessels.len() + v])
                        .map(|(_, vessel)| *vessel)
                        .collect::<Vec<_>>();
                    (*station, open)
                })
                .filter(|(_, open)| !open.is_empty())
                .collect();
            if entries.is_empty() {
                entries.push((first, vessels.clone()));
            }
            *counts.entry(Combination::new(entries)).or_insert(0) += count;
        }
        JointShares::from_counts(counts).ok()
    })
}

/// A scenario together with a share distribution over its stations
#[derive(Debug, Clone)]
pub struct PlanningFixture {
    pub scenario: Scenario,
    pub joint: JointShares,
}

pub fn planning_fixture(shape: ScenarioShape) -> impl Strategy<Value = PlanningFixture> {
    scenario(shape)
        .prop_flat_map(|sc| {
            let shares = joint_shares(&sc, 4);
            (Just(sc), shares)
        })
        .prop_map(|(scenario, joint)| PlanningFixture { scenario, joint })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_coastal_point_is_valid(p in coastal_point()) {
            prop_assert!(p.is_valid());
        }

        #[test]
        fn test_scenario_validates(sc in scenario(ScenarioShape::default())) {
            prop_assert!(sc.validate().is_ok());
            prop_assert!(sc.station_count() >= 1);
            for station in sc.stations() {
                prop_assert!(sc.allowed_vessels(station.id).next().is_some());
            }
        }

        #[test]
        fn test_fixture_shares_are_normalized(fixture in planning_fixture(ScenarioShape::default())) {
            prop_assert!((fixture.joint.total() - 1.0).abs() < 1e-9);
            for (combination, fraction) in fixture.joint.iter() {
                prop_assert!(!combination.is_empty());
                prop_assert!(fraction > 0.0);
            }
        }
    }
}

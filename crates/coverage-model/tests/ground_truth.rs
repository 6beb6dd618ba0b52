//! Hand-computed objectives for a two-station scenario
//!
//! Station A opens for both vessel types, station B only for the fast one.
//! Each is the only open station half of the time.

use coastal_geo::GeoPoint;
use coverage_model::{
    solve_model, Assignment, BestTidalBuilder, CoverageBuilder, CoveragePolicy, MicroLpSolver,
    ObjectiveEvaluator,
};
use rescue_scenario::{IncidentId, IncidentType, Scenario, Station, StationId, VesselId, VesselType, Zone, ZoneId};
use tidal_shares::{Combination, JointShares};

const A: StationId = StationId(0);
const B: StationId = StationId(1);
const FAST: VesselId = VesselId(0);
const SLOW: VesselId = VesselId(1);

const POS_A: GeoPoint = GeoPoint::new(54.0, 8.0);
const POS_B: GeoPoint = GeoPoint::new(54.0, 8.6);
const POS_ZONE: GeoPoint = GeoPoint::new(54.2, 8.3);

fn scenario() -> Scenario {
    let mut sc = Scenario::new();
    sc.insert_vessel(VesselType::new(FAST, 1, 20.0).with_name("fast")).unwrap();
    sc.insert_vessel(VesselType::new(SLOW, 1, 10.0).with_name("slow")).unwrap();
    sc.insert_station(Station::new(A, POS_A).with_name("A")).unwrap();
    sc.insert_station(Station::new(B, POS_B).with_name("B")).unwrap();
    for station in [A, B] {
        for vessel in [FAST, SLOW] {
            sc.allow(station, vessel).unwrap();
        }
    }
    sc.insert_zone(Zone::new(ZoneId(0), POS_ZONE)).unwrap();
    sc.insert_incident(
        IncidentType::new(IncidentId(0), 1.0)
            .permit(FAST)
            .permit(SLOW)
            .with_probability(ZoneId(0), 1.0),
    )
    .unwrap();
    sc.compute_reachability();
    sc.validate().unwrap();
    sc
}

fn shares() -> JointShares {
    JointShares::from_fractions(vec![
        (Combination::new(vec![(A, vec![FAST, SLOW])]), 0.5),
        (Combination::new(vec![(B, vec![FAST])]), 0.5),
    ])
    .unwrap()
}

fn hours(from: GeoPoint, speed: f64) -> f64 {
    from.distance_nm(&POS_ZONE) / speed
}

#[test]
fn test_slow_vessel_at_b_leaves_half_unfulfilled() {
    let sc = scenario();
    let joint = shares();
    let assignment: Assignment = vec![(A, FAST), (B, SLOW)].into_iter().collect();

    let eval = ObjectiveEvaluator::new(&sc, &joint).evaluate(&assignment);
    assert!((eval.objective - 0.5 * hours(POS_A, 20.0)).abs() < 1e-12);
    assert_eq!(eval.unfulfilled_count, 1);
    assert!((eval.unfulfilled_mass - 0.5).abs() < 1e-12);
    assert!((eval.unfulfilled_weight - 1.0).abs() < 1e-12);
    assert_eq!(eval.value(), f64::INFINITY);
}

#[test]
fn test_best_tidal_optimum_matches_evaluator() {
    let sc = scenario();
    let joint = shares();
    let model = BestTidalBuilder::new(&joint).build(&sc, CoveragePolicy::Strict).unwrap();
    assert_eq!(model.states.len(), 2);
    assert_eq!(model.uncoverable, 0);

    let outcome = solve_model(&model, &MicroLpSolver::default()).unwrap();
    assert!(outcome.is_optimal(), "status {}", outcome.status);

    // B is only usable by the fast vessel, which leaves the slow one for A
    let assignment = model.extract_assignment(&outcome.values);
    assert_eq!(assignment.vessel_at(A), Some(SLOW));
    assert_eq!(assignment.vessel_at(B), Some(FAST));

    let expected = 0.5 * hours(POS_A, 10.0) + 0.5 * hours(POS_B, 20.0);
    let objective = outcome.objective.unwrap();
    assert!((objective - expected).abs() < 1e-6);

    let eval = ObjectiveEvaluator::new(&sc, &joint).evaluate(&assignment);
    assert!(eval.is_fulfilled());
    assert!((eval.value() - objective).abs() < 1e-6);
}

#[test]
fn test_strict_model_without_responder_is_not_solved() {
    let mut sc = scenario();
    // without B the state where only B is open has no responder
    sc.retain_stations(|s| s.id == A);
    let joint = shares();

    let model = BestTidalBuilder::new(&joint).build(&sc, CoveragePolicy::Strict).unwrap();
    assert_eq!(model.uncoverable, 1);
    let outcome = solve_model(&model, &MicroLpSolver::default()).unwrap();
    assert_eq!(outcome.status, coverage_model::SolveStatus::Infeasible);
    assert!(outcome.elapsed.is_zero());
}

#[test]
fn test_penalized_model_reports_slack_instead() {
    let mut sc = scenario();
    sc.retain_stations(|s| s.id == A);
    let joint = shares();

    let model = BestTidalBuilder::new(&joint)
        .build(&sc, CoveragePolicy::Penalized { penalty: 1_000.0 })
        .unwrap();
    let outcome = solve_model(&model, &MicroLpSolver::default()).unwrap();
    assert!(outcome.is_optimal());
    assert_eq!(model.slack_used(&outcome.values), 1);

    let assignment = model.extract_assignment(&outcome.values);
    assert_eq!(assignment.vessel_at(A), Some(FAST));
    let expected = 0.5 * hours(POS_A, 20.0) + 1_000.0 * 0.5;
    assert!((outcome.objective.unwrap() - expected).abs() < 1e-6);
}

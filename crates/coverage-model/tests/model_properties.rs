//! Properties of solved coverage models over generated scenarios

use coverage_model::{
    solve_model, BestTidalBuilder, BetterTidalBuilder, CoverageBuilder, CoverageModel,
    CoveragePolicy, ManyZonesBuilder, MicroLpSolver, ObjectiveEvaluator, SolveOutcome,
    BINARY_CUTOFF,
};
use fuzz_harness::prelude::*;
use std::collections::BTreeMap;
use tidal_shares::ConsolidatedShares;

/// Large enough that covering is always cheaper than slack
const PENALTY: f64 = 10_000.0;

fn shape() -> ScenarioShape {
    ScenarioShape {
        max_stations: 3,
        max_vessels: 2,
        max_zones: 2,
        max_incidents: 2,
    }
}

fn penalized() -> CoveragePolicy {
    CoveragePolicy::Penalized { penalty: PENALTY }
}

fn solve(model: &CoverageModel) -> SolveOutcome {
    solve_model(model, &MicroLpSolver::default()).unwrap()
}

fn slack_cost(model: &CoverageModel, values: &[f64]) -> f64 {
    model
        .slack_vars
        .iter()
        .filter(|var| values[var.index()] > BINARY_CUTOFF)
        .map(|var| model.program.variable(*var).map(|v| v.cost).unwrap_or(0.0))
        .sum()
}

fn check_assignment_limits(fixture: &PlanningFixture, model: &CoverageModel, values: &[f64]) -> Result<(), TestCaseError> {
    let mut per_vessel: BTreeMap<_, u32> = BTreeMap::new();
    let mut per_station: BTreeMap<_, u32> = BTreeMap::new();
    for (&(vessel, station), var) in &model.assignment_vars {
        if values[var.index()] > BINARY_CUTOFF {
            *per_vessel.entry(vessel).or_default() += 1;
            *per_station.entry(station).or_default() += 1;
        }
    }
    for (vessel, used) in per_vessel {
        let fleet = fixture.scenario.vessel(vessel).unwrap().fleet_size;
        prop_assert!(used <= fleet, "{} used {} times with fleet {}", vessel, used, fleet);
    }
    for (station, used) in per_station {
        prop_assert!(used <= 1, "{} holds {} vessels", station, used);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_fleet_cap_and_one_vessel_per_station(fixture in planning_fixture(shape())) {
        let mut scenario = fixture.scenario.clone();
        let consolidated = ConsolidatedShares::from_joint(&fixture.joint, &scenario);
        consolidated.apply_thresholds(&mut scenario).unwrap();

        let models = vec![
            ManyZonesBuilder.build(&scenario, penalized()).unwrap(),
            BetterTidalBuilder::new(&consolidated).build(&scenario, penalized()).unwrap(),
            BestTidalBuilder::new(&fixture.joint).build(&scenario, penalized()).unwrap(),
        ];
        for model in &models {
            let outcome = solve(model);
            prop_assert!(outcome.is_optimal(), "{} ended with {}", model.variant, outcome.status);
            check_assignment_limits(&fixture, model, &outcome.values)?;

            let assignment = model.extract_assignment(&outcome.values);
            for (vessel, used) in assignment.usage() {
                prop_assert!(used <= scenario.vessel(vessel).unwrap().fleet_size);
            }
            for (station, vessel) in assignment.iter() {
                prop_assert!(scenario.is_allowed(station, vessel));
            }
        }
    }

    #[test]
    fn test_best_tidal_objective_matches_evaluator(fixture in planning_fixture(shape())) {
        let model = BestTidalBuilder::new(&fixture.joint)
            .build(&fixture.scenario, penalized())
            .unwrap();
        let outcome = solve(&model);
        prop_assert!(outcome.is_optimal());

        let assignment = model.extract_assignment(&outcome.values);
        let eval = ObjectiveEvaluator::new(&fixture.scenario, &fixture.joint).evaluate(&assignment);
        prop_assert_eq!(eval.unfulfilled_count, model.slack_used(&outcome.values) as u64);

        let objective = outcome.objective.unwrap();
        let recomputed = eval.objective + slack_cost(&model, &outcome.values);
        prop_assert!(
            (objective - recomputed).abs() <= 1e-6 * objective.abs().max(1.0),
            "solver {} vs evaluator {}",
            objective,
            recomputed
        );
        if eval.is_fulfilled() {
            prop_assert!((eval.value() - objective).abs() <= 1e-6 * objective.abs().max(1.0));
        }
    }

    #[test]
    fn test_better_tidal_refinement_never_increases_optimum(
        fixture in planning_fixture(shape()),
        extra in thresholds(3),
    ) {
        let consolidated = ConsolidatedShares::from_joint(&fixture.joint, &fixture.scenario);

        let coarse = BetterTidalBuilder::new(&consolidated)
            .build(&fixture.scenario, penalized())
            .unwrap();
        let fine = BetterTidalBuilder::new(&consolidated)
            .with_thresholds(extra)
            .build(&fixture.scenario, penalized())
            .unwrap();
        prop_assert!(fine.states.len() >= coarse.states.len());

        let coarse_outcome = solve(&coarse);
        let fine_outcome = solve(&fine);
        prop_assert!(coarse_outcome.is_optimal() && fine_outcome.is_optimal());

        let coarse_value = coarse_outcome.objective.unwrap();
        let fine_value = fine_outcome.objective.unwrap();
        prop_assert!(
            fine_value <= coarse_value + 1e-6 * coarse_value.abs().max(1.0),
            "refined {} exceeds coarse {}",
            fine_value,
            coarse_value
        );
    }

    #[test]
    fn test_state_weights_cover_unit_interval(fixture in planning_fixture(shape()), extra in thresholds(3)) {
        let consolidated = ConsolidatedShares::from_joint(&fixture.joint, &fixture.scenario);
        let builders: Vec<Box<dyn CoverageBuilder + '_>> = vec![
            Box::new(ManyZonesBuilder),
            Box::new(BetterTidalBuilder::new(&consolidated).with_thresholds(extra)),
            Box::new(BestTidalBuilder::new(&fixture.joint)),
        ];
        for builder in builders {
            let states = builder.states(&fixture.scenario).unwrap();
            let total: f64 = states.iter().map(|s| s.weight).sum();
            prop_assert!((total - 1.0).abs() < 1e-9, "{} weights sum to {}", builder.variant(), total);
            for state in &states {
                prop_assert!(state.open.iter().all(|&(s, v)| fixture.scenario.is_allowed(s, v)));
            }
        }
    }
}

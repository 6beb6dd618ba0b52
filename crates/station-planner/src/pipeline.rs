//! Planning pipeline
//!
//! Stages run strictly in order and each owns its inputs until it hands
//! the result on: shares, scenario assembly, consolidation, clustering,
//! model build, solve, evaluation.

use crate::loader;
use crate::record::RunRecord;
use crate::{DataLayout, Result};
use coverage_model::{
    solve_model, Assignment, BestTidalBuilder, BetterTidalBuilder, CoverageBuilder, CoverageModel,
    CoveragePolicy, Evaluation, ManyZonesBuilder, MicroLpSolver, ModelVariant, ObjectiveEvaluator,
    SolveOutcome, Solver, SolverConfig,
};
use rescue_scenario::generate::ZoneSource;
use rescue_scenario::{cluster_zones, zones, GeneratorConfig, Scenario, ScenarioGenerator, Water};
use std::time::Instant;
use tidal_shares::store::compute_artifacts;
use tidal_shares::{ConsolidatedShares, LogProgress, ShareArtifacts, ShareStore};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub seed: u64,
    /// Zones to load (or raster) before clustering
    pub zones: usize,
    /// Target zone count after clustering
    pub clusters: usize,
    pub water: Water,
    pub variant: ModelVariant,
    pub policy: CoveragePolicy,
    pub solver: SolverConfig,
    pub generator: GeneratorConfig,
}

impl PlannerConfig {
    /// Strict coverage, default solver and generator, no zone reduction
    pub fn new(seed: u64, zones: usize, water: Water, variant: ModelVariant) -> Self {
        Self {
            seed,
            zones,
            clusters: zones,
            water,
            variant,
            policy: CoveragePolicy::default(),
            solver: SolverConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }

    pub fn with_clusters(mut self, clusters: usize) -> Self {
        self.clusters = clusters;
        self
    }

    pub fn with_policy(mut self, policy: CoveragePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub record: RunRecord,
    pub scenario: Scenario,
    pub outcome: SolveOutcome,
    pub assignment: Assignment,
    pub evaluation: Evaluation,
}

pub struct Planner {
    layout: DataLayout,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(layout: DataLayout, config: PlannerConfig) -> Self {
        Self { layout, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Cached share artifacts for the configured water, scanning gauges if absent
    pub fn share_artifacts(&self) -> Result<ShareArtifacts> {
        let store = ShareStore::new(self.layout.share_root());
        let water = self.config.water;
        // the fleet files are only needed for a fresh scan
        let fleet = if store.is_cached(water) {
            None
        } else {
            Some(loader::load_fleet(
                self.layout.fleet_stations(),
                self.layout.fleet_vessels(),
            )?)
        };
        let artifacts = store.load_or_compute(water, || {
            let (stations, vessels) = fleet.unwrap_or_default();
            compute_artifacts(
                &self.layout.gauge_root(),
                water,
                stations,
                vessels,
                &mut LogProgress::default(),
            )
        })?;
        Ok(artifacts)
    }

    /// Assemble the scenario and store consolidated station thresholds in it
    pub fn prepare(&self, artifacts: &ShareArtifacts) -> Result<(Scenario, ConsolidatedShares)> {
        let mut scenario = artifacts.to_scenario()?;
        let water = self.config.water;
        scenario.retain_stations(|s| water.contains_longitude(s.position.longitude));

        let zone_path = self.layout.zone_file(water, self.config.zones, self.config.seed);
        let source = if zone_path.exists() {
            info!("Loading zones from {:?}", zone_path);
            ZoneSource::Points(zones::load_zone_file(&zone_path)?)
        } else {
            warn!("Zone file {:?} not found", zone_path);
            ZoneSource::Raster {
                max_zones: self.config.zones,
            }
        };

        let mut generator = ScenarioGenerator::new(self.config.seed, self.config.generator.clone());
        generator.populate(&mut scenario, source)?;

        let consolidated = ConsolidatedShares::from_joint(&artifacts.shares, &scenario);
        consolidated.apply_thresholds(&mut scenario)?;
        Ok((scenario, consolidated))
    }

    pub fn build_model(
        &self,
        scenario: &Scenario,
        artifacts: &ShareArtifacts,
        consolidated: &ConsolidatedShares,
    ) -> Result<CoverageModel> {
        let policy = self.config.policy;
        let model = match self.config.variant {
            ModelVariant::ManyZones => ManyZonesBuilder.build(scenario, policy)?,
            ModelVariant::BetterTidal => BetterTidalBuilder::new(consolidated).build(scenario, policy)?,
            ModelVariant::BestTidal => BestTidalBuilder::new(&artifacts.shares).build(scenario, policy)?,
        };
        Ok(model)
    }

    /// Full run with the shipped solver
    pub fn run(&self) -> Result<PlanOutcome> {
        let artifacts = self.share_artifacts()?;
        let solver = MicroLpSolver::new(self.config.solver.clone())?;
        self.run_with(&artifacts, &solver)
    }

    pub fn run_with(&self, artifacts: &ShareArtifacts, solver: &dyn Solver) -> Result<PlanOutcome> {
        info!(
            "Planning with seed {}, {} zones and {} for {}",
            self.config.seed, self.config.zones, self.config.variant, self.config.water
        );
        let (mut scenario, consolidated) = self.prepare(artifacts)?;

        let start = Instant::now();
        let clusters = cluster_zones(&mut scenario, self.config.clusters)?;
        info!("Reduced to {} zones", clusters);
        scenario.validate()?;

        let model = self.build_model(&scenario, artifacts, &consolidated)?;
        let outcome = solve_model(&model, solver)?;
        let runtime = start.elapsed().as_secs_f64();
        info!("Time: {:.3}s", runtime);

        // a solve stopped by the time limit still yields its best point
        let assignment = if outcome.has_solution() {
            if !outcome.is_optimal() {
                info!("Using best point found before {}", outcome.status);
            }
            model.extract_assignment(&outcome.values)
        } else {
            Assignment::new()
        };
        if model.slack_vars.is_empty() {
            info!("Assignment covers {} stations", assignment.len());
        } else {
            info!(
                "Assignment covers {} stations, {} triples left to slack",
                assignment.len(),
                model.slack_used(&outcome.values)
            );
        }

        info!("Calculating compare value");
        let evaluation = ObjectiveEvaluator::new(&scenario, &artifacts.shares).evaluate(&assignment);
        let record = RunRecord::new(&self.config, clusters, runtime, &outcome, &evaluation);

        Ok(PlanOutcome {
            record,
            scenario,
            outcome,
            assignment,
            evaluation,
        })
    }
}

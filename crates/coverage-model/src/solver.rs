//! Solver boundary
//!
//! A [`Solver`] receives an [`IntegerProgram`] and returns a status, the
//! variable values and the elapsed time. The shipped backend runs
//! `good_lp` with the pure-Rust microlp engine on a dedicated worker
//! thread. The engine enforces the time limit itself and hands back its
//! best feasible point when the limit fires, so the caller joins the
//! worker instead of abandoning it.

use crate::builder::CoverageModel;
use crate::program::{IntegerProgram, Sense};
use crate::{ModelError, Result, FEASIBILITY_TOLERANCE};
use good_lp::{
    default_solver, variable, variables, Expression, ResolutionError, Solution, SolutionStatus,
    SolverModel, WithTimeLimit,
};
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Six hours
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub time_limit: Duration,
    /// Engine threads; only one is supported so runs stay reproducible
    pub threads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: DEFAULT_TIME_LIMIT,
            threads: 1,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads != 1 {
            return Err(ModelError::UnsupportedThreads(self.threads));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Optimal,
    TimeLimit,
    Infeasible,
    Other(String),
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => f.write_str("OPTIMAL"),
            SolveStatus::TimeLimit => f.write_str("TIME_LIMIT"),
            SolveStatus::Infeasible => f.write_str("INFEASIBLE"),
            SolveStatus::Other(reason) => write!(f, "OTHER({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Engine objective; `None` unless a solution was found
    pub objective: Option<f64>,
    /// Value per variable index; empty without a solution
    pub values: Vec<f64>,
    pub elapsed: Duration,
}

impl SolveOutcome {
    fn without_solution(status: SolveStatus, elapsed: Duration) -> Self {
        Self {
            status,
            objective: None,
            values: Vec::new(),
            elapsed,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    pub fn has_solution(&self) -> bool {
        !self.values.is_empty()
    }
}

pub trait Solver {
    fn name(&self) -> &str;

    fn solve(&self, program: &IntegerProgram) -> Result<SolveOutcome>;
}

/// Solve a coverage model, skipping the engine when it cannot be feasible
pub fn solve_model(model: &CoverageModel, solver: &dyn Solver) -> Result<SolveOutcome> {
    if model.is_trivially_infeasible() {
        warn!(
            "Skipping {}: {} coverage triples cannot be served",
            solver.name(),
            model.uncoverable
        );
        return Ok(SolveOutcome::without_solution(SolveStatus::Infeasible, Duration::ZERO));
    }
    solver.solve(&model.program)
}

/// Message microlp reports when the limit fires before any feasible point
const NO_INCUMBENT: &str = "Time limit reached before finding a feasible solution";

#[derive(Debug)]
enum Reply {
    /// Values of a feasible point and whether it is proven optimal
    Solved { values: Vec<f64>, status: SolveStatus },
    Infeasible,
    /// Time limit reached without a feasible point
    OutOfTime,
    Failed(String),
}

impl Reply {
    fn into_outcome(self, program: &IntegerProgram, elapsed: Duration) -> SolveOutcome {
        match self {
            Reply::Solved { values, status } => {
                if let Some(name) = program.first_violation(&values, FEASIBILITY_TOLERANCE) {
                    warn!("Solver returned a point violating {}", name);
                }
                SolveOutcome {
                    status,
                    objective: Some(program.objective_value(&values)),
                    values,
                    elapsed,
                }
            }
            Reply::Infeasible => SolveOutcome::without_solution(SolveStatus::Infeasible, elapsed),
            Reply::OutOfTime => SolveOutcome::without_solution(SolveStatus::TimeLimit, elapsed),
            Reply::Failed(reason) => SolveOutcome::without_solution(SolveStatus::Other(reason), elapsed),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MicroLpSolver {
    config: SolverConfig,
}

impl MicroLpSolver {
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl Solver for MicroLpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, program: &IntegerProgram) -> Result<SolveOutcome> {
        info!(
            "Solving {} variables, {} constraints (time limit {:?})",
            program.var_count(),
            program.constraint_count(),
            self.config.time_limit
        );
        let start = Instant::now();
        let job = program.clone();
        let time_limit = self.config.time_limit;

        let worker = thread::Builder::new()
            .name("coverage-solver".into())
            .spawn(move || run_job(&job, time_limit))
            .map_err(|e| ModelError::Solver(format!("cannot spawn solver thread: {}", e)))?;
        let reply = worker
            .join()
            .unwrap_or_else(|_| Reply::Failed("solver panicked".to_string()));

        let outcome = reply.into_outcome(program, start.elapsed());
        if outcome.status == SolveStatus::TimeLimit {
            if outcome.has_solution() {
                warn!("Time limit of {:?} reached, keeping best point found", time_limit);
            } else {
                warn!("Time limit of {:?} reached before a feasible point", time_limit);
            }
        }
        info!("Solve finished: {} after {:?}", outcome.status, outcome.elapsed);
        Ok(outcome)
    }
}

fn run_job(program: &IntegerProgram, time_limit: Duration) -> Reply {
    // constraints without terms are constants; check them here
    for c in program.constraints().iter().filter(|c| c.terms.is_empty()) {
        if !c.is_satisfied(&[], FEASIBILITY_TOLERANCE) {
            debug!("Constant constraint {} cannot hold", c.name);
            return Reply::Infeasible;
        }
    }
    if program.var_count() == 0 {
        return Reply::Solved {
            values: Vec::new(),
            status: SolveStatus::Optimal,
        };
    }

    let mut vars = variables!();
    let xs: Vec<_> = program
        .variables()
        .iter()
        .map(|v| vars.add(variable().binary().name(v.name.clone())))
        .collect();

    let objective = program
        .variables()
        .iter()
        .zip(&xs)
        .fold(Expression::from(0.0), |acc, (v, x)| acc + v.cost * *x);

    let mut problem = vars
        .minimise(objective)
        .using(default_solver)
        .with_time_limit(time_limit.as_secs_f64());
    for c in program.constraints().iter().filter(|c| !c.terms.is_empty()) {
        let lhs = c
            .terms
            .iter()
            .fold(Expression::from(0.0), |acc, (var, coef)| acc + *coef * xs[var.index()]);
        let constraint = match c.sense {
            Sense::Le => lhs.leq(c.rhs),
            Sense::Eq => lhs.eq(c.rhs),
            Sense::Ge => lhs.geq(c.rhs),
        };
        problem.add_constraint(constraint);
    }

    match problem.solve() {
        Ok(solution) => Reply::Solved {
            values: xs.iter().map(|x| solution.value(*x)).collect(),
            status: engine_status(solution.status()),
        },
        Err(ResolutionError::Infeasible) => Reply::Infeasible,
        Err(ResolutionError::Other(reason)) if reason == NO_INCUMBENT => Reply::OutOfTime,
        Err(e) => Reply::Failed(e.to_string()),
    }
}

fn engine_status(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::TimeLimit => SolveStatus::TimeLimit,
        SolutionStatus::GapLimit => SolveStatus::Other("GAP_LIMIT".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_single_thread_is_accepted() {
        let config = SolverConfig {
            threads: 4,
            ..SolverConfig::default()
        };
        assert!(matches!(MicroLpSolver::new(config), Err(ModelError::UnsupportedThreads(4))));
        assert_eq!(SolverConfig::default().time_limit, Duration::from_secs(21_600));
    }

    #[test]
    fn test_small_program_is_optimal() {
        let mut p = IntegerProgram::new();
        let a = p.add_binary("a", 3.0);
        let b = p.add_binary("b", 1.0);
        let c = p.add_binary("c", 2.0);
        p.add_constraint("two", vec![(a, 1.0), (b, 1.0), (c, 1.0)], Sense::Eq, 2.0);

        let outcome = MicroLpSolver::default().solve(&p).unwrap();
        assert!(outcome.is_optimal());
        assert!((outcome.objective.unwrap() - 3.0).abs() < 1e-6);
        assert!(outcome.values[a.index()] < 0.5);
    }

    #[test]
    fn test_constant_infeasible_constraint() {
        let mut p = IntegerProgram::new();
        p.add_binary("a", 1.0);
        p.add_constraint("never", Vec::new(), Sense::Eq, 1.0);
        let outcome = MicroLpSolver::default().solve(&p).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(!outcome.has_solution());
    }

    #[test]
    fn test_conflicting_constraints_are_infeasible() {
        let mut p = IntegerProgram::new();
        let a = p.add_binary("a", 1.0);
        let b = p.add_binary("b", 1.0);
        p.add_constraint("both", vec![(a, 1.0), (b, 1.0)], Sense::Ge, 2.0);
        p.add_constraint("at_most_one", vec![(a, 1.0), (b, 1.0)], Sense::Le, 1.0);
        let outcome = MicroLpSolver::default().solve(&p).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_time_limit_keeps_best_point() {
        let mut p = IntegerProgram::new();
        let a = p.add_binary("a", 3.0);
        let b = p.add_binary("b", 1.0);
        p.add_constraint("one", vec![(a, 1.0), (b, 1.0)], Sense::Eq, 1.0);

        let reply = Reply::Solved {
            values: vec![1.0, 0.0],
            status: engine_status(SolutionStatus::TimeLimit),
        };
        let outcome = reply.into_outcome(&p, Duration::from_millis(5));
        assert_eq!(outcome.status, SolveStatus::TimeLimit);
        assert!(outcome.has_solution());
        assert!(!outcome.is_optimal());
        assert_eq!(outcome.objective, Some(3.0));

        let outcome = Reply::OutOfTime.into_outcome(&p, Duration::from_millis(5));
        assert_eq!(outcome.status, SolveStatus::TimeLimit);
        assert!(!outcome.has_solution());
    }

    #[test]
    fn test_tight_time_limit_returns_promptly() {
        // 60 binaries in 20 overlapping triples, each triple covered at least once
        let mut p = IntegerProgram::new();
        let xs: Vec<_> = (0..60)
            .map(|i| p.add_binary(format!("x{}", i), 1.0 + (i % 7) as f64))
            .collect();
        for k in 0..20 {
            let terms = (0..3).map(|j| (xs[(k * 3 + j * 7) % 60], 1.0)).collect();
            p.add_constraint(format!("cover{}", k), terms, Sense::Ge, 1.0);
        }

        let config = SolverConfig::default().with_time_limit(Duration::from_millis(1));
        let outcome = MicroLpSolver::new(config).unwrap().solve(&p).unwrap();
        assert!(outcome.elapsed < Duration::from_secs(30));
        match outcome.status {
            SolveStatus::Optimal => assert!(outcome.has_solution()),
            SolveStatus::TimeLimit => {
                if outcome.has_solution() {
                    assert_eq!(p.first_violation(&outcome.values, FEASIBILITY_TOLERANCE), None);
                }
            }
            other => panic!("unexpected status {}", other),
        }
    }
}

//! Simulation driver
//!
//! Deterministic runs apply the plan's growth rate every year. Monte Carlo
//! batches run every configured scenario for `trials` independent trials,
//! each with its own snapshot and return path, and reduce the completed
//! trials to per-scenario statistics.

use rand::SeedableRng;
use rand::rngs::SmallRng;
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{info, warn};

use crate::analysis::summarize_scenario;
use crate::config::PlanConfig;
use crate::engine::YearEngine;
use crate::error::{EngineError, MarketError, SimulationError};
use crate::model::{
    MarketScenario, MonteCarloConfig, MonteCarloProgress, MonteCarloReport, ReturnDistribution,
    ScenarioResult, TrialOutcome, YearRecord,
};

// ============================================================================
// Single runs
// ============================================================================

/// Run the plan over `returns`, one return per simulated year
fn run_path(plan: &PlanConfig, returns: &[f64]) -> Result<Vec<YearRecord>, EngineError> {
    let mut engine = YearEngine::new(plan);
    returns.iter().map(|&r| engine.step(r)).collect()
}

/// Run the plan with its fixed growth rate every year
pub fn simulate_deterministic(plan: &PlanConfig) -> Result<Vec<YearRecord>, SimulationError> {
    let returns = vec![plan.nominal_growth_rate; plan.horizon_years()];
    let records = simulate_path(plan, &returns)?;

    for record in records.iter().filter(|r| r.shortfall) {
        warn!(
            age = record.age,
            year = record.year,
            unfunded = record.unfunded(),
            "expenses not fully funded without the Roth"
        );
    }
    Ok(records)
}

/// Run the plan over an explicit sequence of annual returns
pub fn simulate_path(
    plan: &PlanConfig,
    returns: &[f64],
) -> Result<Vec<YearRecord>, SimulationError> {
    plan.validate()?;
    let expected = plan.horizon_years();
    if returns.len() != expected {
        return Err(SimulationError::PathLength {
            expected,
            actual: returns.len(),
        });
    }
    Ok(run_path(plan, returns)?)
}

// ============================================================================
// Return sources
// ============================================================================

/// Identifies one trial within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialKey {
    pub scenario_index: usize,
    pub trial: usize,
    pub seed: u64,
}

/// Source of annual return paths for Monte Carlo trials.
///
/// Implementations must be deterministic in their inputs so that a batch is
/// reproducible regardless of how trials are scheduled across threads.
pub trait ReturnSampler: Sync {
    fn sample_path(
        &self,
        scenario: &MarketScenario,
        distribution: ReturnDistribution,
        years: usize,
        key: TrialKey,
    ) -> Result<Vec<f64>, MarketError>;
}

/// Draws paths from the scenario's distribution with a per-trial seeded RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededSampler;

impl ReturnSampler for SeededSampler {
    fn sample_path(
        &self,
        scenario: &MarketScenario,
        distribution: ReturnDistribution,
        years: usize,
        key: TrialKey,
    ) -> Result<Vec<f64>, MarketError> {
        let mut rng = SmallRng::seed_from_u64(key.seed);
        scenario.sample_path(distribution, years, &mut rng)
    }
}

/// Replays fixed paths, trial `i` getting `paths[i % paths.len()]`.
///
/// Useful for historical sequences and for checking aggregation without randomness.
#[derive(Debug, Clone, Default)]
pub struct FixedReturns {
    pub paths: Vec<Vec<f64>>,
}

impl FixedReturns {
    #[must_use]
    pub fn new(paths: Vec<Vec<f64>>) -> Self {
        Self { paths }
    }
}

impl ReturnSampler for FixedReturns {
    fn sample_path(
        &self,
        _scenario: &MarketScenario,
        _distribution: ReturnDistribution,
        years: usize,
        key: TrialKey,
    ) -> Result<Vec<f64>, MarketError> {
        if self.paths.is_empty() {
            return Err(MarketError::PathLength {
                expected: years,
                actual: 0,
            });
        }
        Ok(self.paths[key.trial % self.paths.len()].clone())
    }
}

// ============================================================================
// Monte Carlo
// ============================================================================

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Seed for one trial, independent of thread scheduling
#[must_use]
pub fn trial_seed(base_seed: u64, scenario_index: usize, trial: usize) -> u64 {
    splitmix64(splitmix64(base_seed ^ ((scenario_index as u64) << 48)) ^ trial as u64)
}

#[cfg(feature = "parallel")]
fn map_trials<T, F>(trials: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..trials).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_trials<T, F>(trials: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..trials).map(f).collect()
}

type TrialRun = (TrialOutcome, Vec<YearRecord>);

fn run_trial<S: ReturnSampler + ?Sized>(
    plan: &PlanConfig,
    scenario: &MarketScenario,
    distribution: ReturnDistribution,
    sampler: &S,
    key: TrialKey,
) -> Result<TrialRun, MarketError> {
    let years = plan.horizon_years();
    let returns = sampler.sample_path(scenario, distribution, years, key)?;
    if returns.len() != years {
        return Err(MarketError::PathLength {
            expected: years,
            actual: returns.len(),
        });
    }
    if let Some((year_index, &value)) = returns.iter().enumerate().find(|(_, r)| !r.is_finite()) {
        return Err(MarketError::NonFiniteReturn { year_index, value });
    }

    let records = run_path(plan, &returns)?;
    let outcome = TrialOutcome::from_path(key.trial, key.seed, scenario.mean, &returns, &records);
    Ok((outcome, records))
}

fn run_scenario<S: ReturnSampler + ?Sized>(
    plan: &PlanConfig,
    config: &MonteCarloConfig,
    scenario_index: usize,
    sampler: &S,
    progress: Option<&MonteCarloProgress>,
) -> Result<ScenarioResult, MarketError> {
    let scenario = &config.scenarios[scenario_index];

    // `None` marks a trial skipped because the batch was cancelled
    let runs: Vec<Option<Result<TrialRun, MarketError>>> = map_trials(config.trials, |trial| {
        if progress.is_some_and(MonteCarloProgress::is_cancelled) {
            return None;
        }
        let key = TrialKey {
            scenario_index,
            trial,
            seed: trial_seed(config.seed, scenario_index, trial),
        };
        let run = run_trial(plan, scenario, config.distribution, sampler, key);
        if let Some(p) = progress {
            p.increment();
        }
        Some(run)
    });

    if progress.is_some_and(MonteCarloProgress::is_cancelled) {
        return Err(MarketError::Cancelled);
    }

    let mut outcomes = Vec::with_capacity(runs.len());
    let mut paths = config.retain_paths.then(Vec::new);
    let mut failed = 0;

    for (trial, run) in runs.into_iter().enumerate() {
        match run {
            Some(Ok((outcome, records))) => {
                outcomes.push(outcome);
                if let Some(paths) = paths.as_mut() {
                    paths.push(records);
                }
            }
            Some(Err(e)) => {
                failed += 1;
                warn!(scenario = %scenario.name, trial, error = %e, "trial excluded from statistics");
            }
            None => return Err(MarketError::Cancelled),
        }
    }

    let summary = summarize_scenario(scenario, &outcomes, failed, config);
    Ok(ScenarioResult {
        summary,
        outcomes,
        paths,
    })
}

fn run_batch<S: ReturnSampler + ?Sized>(
    plan: &PlanConfig,
    config: &MonteCarloConfig,
    sampler: &S,
    progress: Option<&MonteCarloProgress>,
) -> Result<MonteCarloReport, MarketError> {
    let scenarios = (0..config.scenarios.len())
        .map(|i| run_scenario(plan, config, i, sampler, progress))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MonteCarloReport {
        trials_per_scenario: config.trials,
        seed: config.seed,
        distribution: config.distribution,
        scenarios,
    })
}

/// Run a Monte Carlo batch.
///
/// Both configurations are validated first. Trials that fail are excluded
/// from the statistics and counted; the batch itself only fails on invalid
/// configuration, a worker pool error or cancellation through `progress`.
pub fn monte_carlo<S: ReturnSampler + ?Sized>(
    plan: &PlanConfig,
    config: &MonteCarloConfig,
    sampler: &S,
    progress: Option<&MonteCarloProgress>,
) -> Result<MonteCarloReport, MarketError> {
    plan.validate()?;
    config.validate()?;

    let names: Vec<&str> = config.scenarios.iter().map(|s| s.name.as_str()).collect();
    info!(
        trials = config.trials,
        seed = config.seed,
        distribution = ?config.distribution,
        scenarios = ?names,
        "starting Monte Carlo batch"
    );

    #[cfg(feature = "parallel")]
    let report = match config.max_threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| MarketError::ThreadPool(e.to_string()))?
            .install(|| run_batch(plan, config, sampler, progress))?,
        None => run_batch(plan, config, sampler, progress)?,
    };
    #[cfg(not(feature = "parallel"))]
    let report = run_batch(plan, config, sampler, progress)?;

    info!(
        scenarios = report.scenarios.len(),
        excluded = report.excluded_trials(),
        "Monte Carlo batch finished"
    );
    Ok(report)
}

/// [`monte_carlo`] with the seeded sampler and no progress tracking
pub fn monte_carlo_simulate(
    plan: &PlanConfig,
    config: &MonteCarloConfig,
) -> Result<MonteCarloReport, MarketError> {
    monte_carlo(plan, config, &SeededSampler, None)
}

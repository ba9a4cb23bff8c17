//! Tests for the Monte Carlo driver
//!
//! These tests verify:
//! - Batches are reproducible from their seed
//! - Shortfall probability counts trials, excluding failed ones
//! - Failed trials are isolated and counted
//! - Cancellation aborts the batch
//! - Zero-volatility scenarios reproduce the deterministic run

use crate::config::PlanConfig;
use crate::error::{ConfigError, MarketError};
use crate::model::{
    MarketScenario, MonteCarloConfig, MonteCarloProgress, ReturnDistribution,
};
use crate::simulation::{
    FixedReturns, ReturnSampler, SeededSampler, TrialKey, monte_carlo, monte_carlo_simulate,
    simulate_deterministic,
};

fn small_config(trials: usize) -> MonteCarloConfig {
    MonteCarloConfig {
        trials,
        seed: 7,
        scenarios: vec![MarketScenario::new("base_case", 0.06, 0.18)],
        ..Default::default()
    }
}

/// Hands out NaN paths to odd trials and the plan's growth rate otherwise
struct FailOddTrials;

impl ReturnSampler for FailOddTrials {
    fn sample_path(
        &self,
        _scenario: &MarketScenario,
        _distribution: ReturnDistribution,
        years: usize,
        key: TrialKey,
    ) -> Result<Vec<f64>, MarketError> {
        let value = if key.trial % 2 == 1 { f64::NAN } else { 0.06 };
        Ok(vec![value; years])
    }
}

#[test]
fn test_batch_is_reproducible() {
    let plan = PlanConfig::default();
    let config = MonteCarloConfig {
        scenarios: MarketScenario::defaults()
            .into_iter()
            .map(|s| s.with_serial_correlation(0.7, 0.1))
            .collect(),
        ..small_config(40)
    };

    let a = monte_carlo_simulate(&plan, &config).unwrap();
    let b = monte_carlo_simulate(&plan, &config).unwrap();
    assert_eq!(a.scenarios.len(), 5);
    for (x, y) in a.scenarios.iter().zip(&b.scenarios) {
        assert_eq!(x.outcomes, y.outcomes);
        assert_eq!(x.summary, y.summary);
    }
}

#[test]
fn test_thread_cap_does_not_change_results() {
    let plan = PlanConfig::default();
    let config = small_config(30);
    let capped = MonteCarloConfig {
        max_threads: Some(1),
        ..config.clone()
    };

    let free = monte_carlo_simulate(&plan, &config).unwrap();
    let single = monte_carlo_simulate(&plan, &capped).unwrap();
    assert_eq!(free.scenarios[0].outcomes, single.scenarios[0].outcomes);
}

#[test]
fn test_shortfall_probability_from_fixed_paths() {
    let plan = PlanConfig::default();
    let years = plan.horizon_years();
    let sampler = FixedReturns::new(vec![vec![0.06; years], vec![-0.5; years]]);

    let report = monte_carlo(&plan, &small_config(10), &sampler, None).unwrap();
    let summary = &report.scenarios[0].summary;

    assert_eq!(summary.completed_trials, 10);
    assert_eq!(summary.failed_trials, 0);
    assert!(
        (summary.shortfall_probability - 0.5).abs() < 1e-12,
        "Expected 0.5, got {}",
        summary.shortfall_probability
    );
    assert!((summary.roth_preservation_rate - 0.5).abs() < 1e-12);

    let outcomes = &report.scenarios[0].outcomes;
    assert!(outcomes.iter().step_by(2).all(|o| o.roth_preserved));
    assert!(outcomes.iter().skip(1).step_by(2).all(|o| o.shortfall_years > 0));
}

#[test]
fn test_failed_trials_are_excluded_and_counted() {
    let plan = PlanConfig::default();
    let report = monte_carlo(&plan, &small_config(9), &FailOddTrials, None).unwrap();
    let result = &report.scenarios[0];

    assert_eq!(result.summary.completed_trials, 5);
    assert_eq!(result.summary.failed_trials, 4);
    assert_eq!(report.excluded_trials(), 4);
    assert_eq!(result.summary.shortfall_probability, 0.0);
    assert!(result.outcomes.iter().all(|o| o.trial % 2 == 0));
}

#[test]
fn test_zero_volatility_matches_deterministic_run() {
    let plan = PlanConfig::default();
    let records = simulate_deterministic(&plan).unwrap();
    let last = records.last().unwrap();

    let config = MonteCarloConfig {
        scenarios: vec![MarketScenario::new("flat", 0.06, 0.0)],
        ..small_config(4)
    };
    let report = monte_carlo_simulate(&plan, &config).unwrap();
    for outcome in &report.scenarios[0].outcomes {
        assert!((outcome.final_roth - last.ending.roth).abs() < 0.01);
        assert!((outcome.final_net_worth - last.net_worth).abs() < 0.01);
        assert!(outcome.sequence_risk < 1e-9);
    }
    let median = report.scenarios[0].summary.roth_percentile(50.0).unwrap();
    assert!((median - last.ending.roth).abs() < 0.01);
}

#[test]
fn test_retained_paths() {
    let plan = PlanConfig::default();
    let config = MonteCarloConfig {
        retain_paths: true,
        ..small_config(3)
    };
    let report = monte_carlo_simulate(&plan, &config).unwrap();
    let paths = report.scenarios[0].paths.as_ref().unwrap();
    assert_eq!(paths.len(), 3);
    assert!(paths.iter().all(|p| p.len() == plan.horizon_years()));

    let unretained = monte_carlo_simulate(&plan, &small_config(3)).unwrap();
    assert!(unretained.scenarios[0].paths.is_none());
}

#[test]
fn test_progress_counts_every_trial() {
    let plan = PlanConfig::default();
    let progress = MonteCarloProgress::new();
    let config = MonteCarloConfig {
        scenarios: MarketScenario::defaults(),
        ..small_config(6)
    };
    monte_carlo(&plan, &config, &SeededSampler, Some(&progress)).unwrap();
    assert_eq!(progress.completed(), 30);
}

#[test]
fn test_cancelled_batch_returns_error() {
    let plan = PlanConfig::default();
    let progress = MonteCarloProgress::new();
    progress.cancel();
    let result = monte_carlo(&plan, &small_config(50), &SeededSampler, Some(&progress));
    assert!(matches!(result, Err(MarketError::Cancelled)));
}

#[test]
fn test_lognormal_batch_runs() {
    let plan = PlanConfig::default();
    let config = MonteCarloConfig {
        distribution: ReturnDistribution::LogNormal,
        ..small_config(20)
    };
    let report = monte_carlo_simulate(&plan, &config).unwrap();
    let summary = &report.scenarios[0].summary;
    assert_eq!(summary.completed_trials, 20);
    let p5 = summary.net_worth_percentile(5.0).unwrap();
    let p95 = summary.net_worth_percentile(95.0).unwrap();
    assert!(p5 <= p95);
}

#[test]
fn test_invalid_batch_configuration() {
    let plan = PlanConfig::default();
    assert_eq!(
        monte_carlo_simulate(&plan, &small_config(0)).unwrap_err(),
        MarketError::Config(ConfigError::ZeroTrials)
    );

    let config = MonteCarloConfig {
        scenarios: vec![MarketScenario::new("bad", 0.06, -0.2)],
        ..small_config(5)
    };
    assert!(matches!(
        monte_carlo_simulate(&plan, &config),
        Err(MarketError::Config(ConfigError::InvalidScenario { .. }))
    ));
}

//! Simulation results
//!
//! Output shapes for a single plan run ([`PlanSummary`]) and for Monte Carlo
//! batches ([`MonteCarloReport`]), plus the knobs and progress handle that
//! drive a batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use super::accounts::AccountSnapshot;
use super::market::{MarketScenario, ReturnDistribution};
use super::records::YearRecord;
use crate::error::ConfigError;

// ============================================================================
// Single run
// ============================================================================

/// Totals over one run's record sequence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSummary {
    pub years: usize,
    pub total_conversions: f64,
    pub total_conversion_tax: f64,
    pub total_withdrawal_tax: f64,
    pub total_taxes: f64,
    /// Always zero under the waterfall; reported so consumers can show it
    pub total_roth_withdrawals: f64,
    pub initial_balances: AccountSnapshot,
    pub final_balances: AccountSnapshot,
    /// All four account balances at the end of the run, home equity excluded
    pub final_liquid_assets: f64,
    pub final_net_worth: f64,
    /// Change in the four account balances from start to end
    pub asset_growth: f64,
    /// Roth share of final net worth
    pub tax_free_share: f64,
    pub shortfall_years: usize,
    pub first_shortfall_age: Option<u32>,
}

impl PlanSummary {
    #[must_use]
    pub fn from_records(initial: AccountSnapshot, records: &[YearRecord]) -> Self {
        let final_balances = records.last().map_or(initial, |r| r.ending);
        let final_net_worth = records.last().map_or(initial.total(), |r| r.net_worth);

        let total_conversions = records.iter().map(|r| r.conversion_amount).sum();
        let total_conversion_tax: f64 = records.iter().map(|r| r.conversion_tax).sum();
        let total_withdrawal_tax: f64 = records.iter().map(|r| r.withdrawal_tax).sum();

        let tax_free_share = if final_net_worth > 0.0 {
            final_balances.roth / final_net_worth
        } else {
            0.0
        };

        Self {
            years: records.len(),
            total_conversions,
            total_conversion_tax,
            total_withdrawal_tax,
            total_taxes: total_conversion_tax + total_withdrawal_tax,
            total_roth_withdrawals: 0.0,
            initial_balances: initial,
            final_balances,
            final_liquid_assets: final_balances.total(),
            final_net_worth,
            asset_growth: final_balances.total() - initial.total(),
            tax_free_share,
            shortfall_years: records.iter().filter(|r| r.shortfall).count(),
            first_shortfall_age: records.iter().find(|r| r.shortfall).map(|r| r.age),
        }
    }
}

// ============================================================================
// Monte Carlo configuration
// ============================================================================

/// Configuration for a Monte Carlo batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Trials per scenario
    pub trials: usize,
    /// Base seed; every trial's seed is derived from it
    pub seed: u64,
    pub distribution: ReturnDistribution,
    pub scenarios: Vec<MarketScenario>,
    /// Percentiles (0-100) reported for terminal Roth and net worth
    pub percentiles: Vec<f64>,
    /// Keep every trial's full record sequence in the report
    pub retain_paths: bool,
    /// Upper bound on worker threads; `None` uses the global pool
    pub max_threads: Option<usize>,
    pub roth_thresholds: Vec<f64>,
    pub net_worth_thresholds: Vec<f64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            seed: 42,
            distribution: ReturnDistribution::Normal,
            scenarios: MarketScenario::defaults(),
            percentiles: vec![5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0],
            retain_paths: false,
            max_threads: None,
            roth_thresholds: vec![1_000_000.0, 2_000_000.0],
            net_worth_thresholds: vec![5_000_000.0],
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if self.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios);
        }
        for (i, scenario) in self.scenarios.iter().enumerate() {
            scenario.validate()?;
            if self.scenarios[..i].iter().any(|s| s.name == scenario.name) {
                return Err(ConfigError::DuplicateScenario(scenario.name.clone()));
            }
        }
        if let Some(&p) = self
            .percentiles
            .iter()
            .find(|p| !(0.0..=100.0).contains(*p))
        {
            return Err(ConfigError::InvalidPercentile(p));
        }
        if self.max_threads == Some(0) {
            return Err(ConfigError::InvalidAmount {
                name: "max_threads",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Shared progress counter and cancellation flag for a running batch.
///
/// Clones share the same atomics, so a caller can keep one clone to poll
/// progress or cancel while another is handed to the driver.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloProgress {
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl MonteCarloProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from existing atomics (for UI integration)
    pub fn from_atomics(completed: Arc<AtomicUsize>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            completed,
            cancelled,
        }
    }

    /// Trials finished so far, across all scenarios
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.completed.store(0, Ordering::Relaxed);
        self.cancelled.store(false, Ordering::Relaxed);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Monte Carlo output
// ============================================================================

/// Terminal and path statistics of one completed trial
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialOutcome {
    pub trial: usize,
    pub seed: u64,
    pub final_net_worth: f64,
    pub final_roth: f64,
    pub total_conversions: f64,
    pub total_taxes: f64,
    pub shortfall_years: usize,
    /// No year needed the Roth to cover expenses
    pub roth_preserved: bool,
    pub worst_year_return: f64,
    pub best_year_return: f64,
    /// Distance of the first five years' mean return from the scenario mean
    pub sequence_risk: f64,
}

impl TrialOutcome {
    /// Years of returns that count toward sequence risk
    pub const SEQUENCE_WINDOW: usize = 5;

    #[must_use]
    pub fn from_path(
        trial: usize,
        seed: u64,
        scenario_mean: f64,
        returns: &[f64],
        records: &[YearRecord],
    ) -> Self {
        let shortfall_years = records.iter().filter(|r| r.shortfall).count();

        let early = &returns[..returns.len().min(Self::SEQUENCE_WINDOW)];
        let sequence_risk = if early.is_empty() {
            0.0
        } else {
            (early.iter().sum::<f64>() / early.len() as f64 - scenario_mean).abs()
        };

        Self {
            trial,
            seed,
            final_net_worth: records.last().map_or(0.0, |r| r.net_worth),
            final_roth: records.last().map_or(0.0, |r| r.ending.roth),
            total_conversions: records.iter().map(|r| r.conversion_amount).sum(),
            total_taxes: records.iter().map(|r| r.total_taxes).sum(),
            shortfall_years,
            roth_preserved: shortfall_years == 0,
            worst_year_return: returns.iter().copied().fold(f64::INFINITY, f64::min),
            best_year_return: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            sequence_risk,
        }
    }
}

/// Five-number style summary of one terminal quantity
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DistributionStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Probability that a terminal quantity reached `target`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThresholdProbability {
    pub target: f64,
    pub probability: f64,
}

/// Aggregate statistics for one scenario.
///
/// All statistics cover completed trials only. With no completed trials every
/// statistic is zero and the percentile lists are empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSummary {
    pub scenario: MarketScenario,
    pub completed_trials: usize,
    pub failed_trials: usize,
    /// Share of completed trials with at least one shortfall year
    pub shortfall_probability: f64,
    pub roth_preservation_rate: f64,
    pub net_worth: DistributionStats,
    pub roth: DistributionStats,
    /// `(percentile, terminal Roth balance)` pairs
    pub roth_percentiles: Vec<(f64, f64)>,
    /// `(percentile, terminal net worth)` pairs
    pub net_worth_percentiles: Vec<(f64, f64)>,
    pub mean_conversions: f64,
    pub mean_taxes: f64,
    pub mean_shortfall_years: f64,
    pub roth_thresholds: Vec<ThresholdProbability>,
    pub net_worth_thresholds: Vec<ThresholdProbability>,
}

impl ScenarioSummary {
    #[must_use]
    pub fn roth_percentile(&self, percentile: f64) -> Option<f64> {
        lookup(&self.roth_percentiles, percentile)
    }

    #[must_use]
    pub fn net_worth_percentile(&self, percentile: f64) -> Option<f64> {
        lookup(&self.net_worth_percentiles, percentile)
    }
}

fn lookup(pairs: &[(f64, f64)], percentile: f64) -> Option<f64> {
    pairs
        .iter()
        .find(|(p, _)| (p - percentile).abs() < 1e-9)
        .map(|(_, v)| *v)
}

/// Everything a batch produced for one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub summary: ScenarioSummary,
    /// Completed trials, ordered by trial index
    pub outcomes: Vec<TrialOutcome>,
    /// Full record sequences, present when paths were retained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<Vec<YearRecord>>>,
}

/// Result of a Monte Carlo batch, one entry per scenario in configuration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloReport {
    pub trials_per_scenario: usize,
    pub seed: u64,
    pub distribution: ReturnDistribution,
    pub scenarios: Vec<ScenarioResult>,
}

impl MonteCarloReport {
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|s| s.summary.scenario.name == name)
    }

    /// Trials excluded from the statistics across every scenario
    #[must_use]
    pub fn excluded_trials(&self) -> usize {
        self.scenarios.iter().map(|s| s.summary.failed_trials).sum()
    }
}

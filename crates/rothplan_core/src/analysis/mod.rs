//! Monte Carlo aggregation
//!
//! Pure reductions from completed [`TrialOutcome`]s to a [`ScenarioSummary`].
//! Failed trials never reach this module; they only contribute a count.

use crate::model::{
    DistributionStats, MarketScenario, MonteCarloConfig, ScenarioSummary, ThresholdProbability,
    TrialOutcome,
};

/// Linear-interpolated percentile (`p` in 0-100) of an ascending slice
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n as f64 - 1.0);
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let w = rank - lower as f64;
                sorted[lower] * (1.0 - w) + sorted[upper] * w
            }
        }
    }
}

fn sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Mean, median, population standard deviation and range of an ascending slice
#[must_use]
pub fn distribution(sorted: &[f64]) -> DistributionStats {
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return DistributionStats::default();
    };
    let mean = mean(sorted);
    let variance =
        sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / sorted.len() as f64;

    DistributionStats {
        mean,
        median: percentile(sorted, 50.0),
        std_dev: variance.sqrt(),
        min,
        max,
    }
}

fn threshold_probabilities(sorted: &[f64], targets: &[f64]) -> Vec<ThresholdProbability> {
    targets
        .iter()
        .map(|&target| ThresholdProbability {
            target,
            probability: if sorted.is_empty() {
                0.0
            } else {
                sorted.iter().filter(|v| **v >= target).count() as f64 / sorted.len() as f64
            },
        })
        .collect()
}

/// Reduce one scenario's completed trials to summary statistics.
///
/// Shortfall probability is the share of completed trials with at least one
/// shortfall year; `failed_trials` are reported but never enter a denominator.
#[must_use]
pub fn summarize_scenario(
    scenario: &MarketScenario,
    outcomes: &[TrialOutcome],
    failed_trials: usize,
    config: &MonteCarloConfig,
) -> ScenarioSummary {
    let completed = outcomes.len();
    let roth = sorted(outcomes.iter().map(|o| o.final_roth));
    let net_worth = sorted(outcomes.iter().map(|o| o.final_net_worth));

    let (shortfall_probability, roth_preservation_rate) = if completed == 0 {
        (0.0, 0.0)
    } else {
        let with_shortfall = outcomes.iter().filter(|o| o.shortfall_years > 0).count();
        let p = with_shortfall as f64 / completed as f64;
        (p, 1.0 - p)
    };

    let bands = |values: &[f64]| -> Vec<(f64, f64)> {
        if values.is_empty() {
            return Vec::new();
        }
        config
            .percentiles
            .iter()
            .map(|&p| (p, percentile(values, p)))
            .collect()
    };

    let conversions: Vec<f64> = outcomes.iter().map(|o| o.total_conversions).collect();
    let taxes: Vec<f64> = outcomes.iter().map(|o| o.total_taxes).collect();
    let shortfall_years: Vec<f64> = outcomes.iter().map(|o| o.shortfall_years as f64).collect();

    ScenarioSummary {
        scenario: scenario.clone(),
        completed_trials: completed,
        failed_trials,
        shortfall_probability,
        roth_preservation_rate,
        net_worth: distribution(&net_worth),
        roth: distribution(&roth),
        roth_percentiles: bands(&roth),
        net_worth_percentiles: bands(&net_worth),
        mean_conversions: mean(&conversions),
        mean_taxes: mean(&taxes),
        mean_shortfall_years: mean(&shortfall_years),
        roth_thresholds: threshold_probabilities(&roth, &config.roth_thresholds),
        net_worth_thresholds: threshold_probabilities(&net_worth, &config.net_worth_thresholds),
    }
}

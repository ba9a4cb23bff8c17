use rand::{Rng, distr::Distribution};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MarketError};

/// Shape of the annual return draw around a scenario's mean
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReturnDistribution {
    /// `r ~ N(mean, volatility)`
    #[default]
    Normal,
    /// `1 + r` is log-normal with mean `1 + mean` and standard deviation `volatility`,
    /// so a year can never lose more than everything
    LogNormal,
}

/// A named market assumption used for one Monte Carlo batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketScenario {
    pub name: String,
    pub mean: f64,
    pub volatility: f64,
    /// Weight of last year's return in this year's return, in `[0, 1)`
    #[serde(default)]
    pub serial_correlation: f64,
    /// Pull of this year's return back toward the mean, `>= 0`
    #[serde(default)]
    pub mean_reversion: f64,
}

impl MarketScenario {
    #[must_use]
    pub fn new(name: impl Into<String>, mean: f64, volatility: f64) -> Self {
        Self {
            name: name.into(),
            mean,
            volatility,
            serial_correlation: 0.0,
            mean_reversion: 0.0,
        }
    }

    #[must_use]
    pub fn with_serial_correlation(mut self, correlation: f64, mean_reversion: f64) -> Self {
        self.serial_correlation = correlation;
        self.mean_reversion = mean_reversion;
        self
    }

    /// The stress scenarios the planner ships with
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("base_case", 0.06, 0.18),
            Self::new("low_return", 0.04, 0.18),
            Self::new("high_volatility", 0.06, 0.25),
            Self::new("stagflation", 0.03, 0.22),
            Self::new("great_recession", 0.02, 0.30),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidScenario {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if !self.mean.is_finite() || self.mean <= -1.0 {
            return Err(invalid("mean return must be finite and above -100%"));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(invalid("volatility must be finite and non-negative"));
        }
        if !(0.0..1.0).contains(&self.serial_correlation) {
            return Err(invalid("serial correlation must be in [0, 1)"));
        }
        if !self.mean_reversion.is_finite() || self.mean_reversion < 0.0 {
            return Err(invalid("mean reversion must be finite and non-negative"));
        }
        Ok(())
    }

    /// Draw one independent annual return
    pub fn sample<R: Rng + ?Sized>(
        &self,
        distribution: ReturnDistribution,
        rng: &mut R,
    ) -> Result<f64, MarketError> {
        match distribution {
            ReturnDistribution::Normal => rand_distr::Normal::new(self.mean, self.volatility)
                .map(|d| d.sample(rng))
                .map_err(|_| MarketError::InvalidDistributionParameters {
                    profile_type: "Normal return",
                    mean: self.mean,
                    std_dev: self.volatility,
                    reason: "std_dev must be non-negative and finite",
                }),
            ReturnDistribution::LogNormal => {
                let (mu, sigma) = lognormal_params(self.mean, self.volatility).ok_or(
                    MarketError::InvalidDistributionParameters {
                        profile_type: "LogNormal return",
                        mean: self.mean,
                        std_dev: self.volatility,
                        reason: "mean must be above -100% and std_dev finite",
                    },
                )?;
                rand_distr::LogNormal::new(mu, sigma)
                    .map(|d| d.sample(rng) - 1.0)
                    .map_err(|_| MarketError::InvalidDistributionParameters {
                        profile_type: "LogNormal return",
                        mean: self.mean,
                        std_dev: self.volatility,
                        reason: "std_dev must be non-negative and finite",
                    })
            }
        }
    }

    /// Draw a path of `years` annual returns.
    ///
    /// Without serial correlation or mean reversion every year is an independent
    /// draw. Otherwise year `t > 0` is
    /// `rho * r[t-1] + (1 - rho) * draw + kappa * (mean - r[t-1])`.
    pub fn sample_path<R: Rng + ?Sized>(
        &self,
        distribution: ReturnDistribution,
        years: usize,
        rng: &mut R,
    ) -> Result<Vec<f64>, MarketError> {
        let rho = self.serial_correlation;
        let kappa = self.mean_reversion;

        let mut path: Vec<f64> = Vec::with_capacity(years);
        for year_index in 0..years {
            let draw = self.sample(distribution, rng)?;
            let value = match path.last() {
                Some(&prev) if rho > 0.0 || kappa > 0.0 => {
                    rho * prev + (1.0 - rho) * draw + kappa * (self.mean - prev)
                }
                _ => draw,
            };
            if !value.is_finite() {
                return Err(MarketError::NonFiniteReturn { year_index, value });
            }
            path.push(value);
        }
        Ok(path)
    }
}

/// Log-space parameters giving `1 + r` the requested arithmetic mean and standard deviation
fn lognormal_params(mean: f64, volatility: f64) -> Option<(f64, f64)> {
    let gross = 1.0 + mean;
    if gross.is_nan() || gross <= 0.0 || !volatility.is_finite() || volatility < 0.0 {
        return None;
    }
    let sigma_sq = (1.0 + (volatility / gross).powi(2)).ln();
    Some((gross.ln() - sigma_sq / 2.0, sigma_sq.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_zero_volatility_is_the_mean() {
        let scenario = MarketScenario::new("flat", 0.05, 0.0);
        let mut rng = SmallRng::seed_from_u64(7);
        let path = scenario
            .sample_path(ReturnDistribution::Normal, 10, &mut rng)
            .unwrap();
        assert_eq!(path.len(), 10);
        assert!(path.iter().all(|r| (r - 0.05).abs() < 1e-12));

        let lognormal = scenario
            .sample_path(ReturnDistribution::LogNormal, 3, &mut rng)
            .unwrap();
        assert!(lognormal.iter().all(|r| (r - 0.05).abs() < 1e-9));
    }

    #[test]
    fn test_lognormal_never_below_minus_one() {
        let scenario = MarketScenario::new("wild", 0.02, 0.6);
        let mut rng = SmallRng::seed_from_u64(11);
        let path = scenario
            .sample_path(ReturnDistribution::LogNormal, 500, &mut rng)
            .unwrap();
        assert!(path.iter().all(|r| *r > -1.0));
    }

    #[test]
    fn test_lognormal_mean_matches_scenario() {
        let scenario = MarketScenario::new("base", 0.06, 0.18);
        let mut rng = SmallRng::seed_from_u64(3);
        let n = 50_000;
        let path = scenario
            .sample_path(ReturnDistribution::LogNormal, n, &mut rng)
            .unwrap();
        let mean = path.iter().sum::<f64>() / n as f64;
        assert!((mean - 0.06).abs() < 0.01, "Expected ~0.06, got {mean}");
    }

    #[test]
    fn test_seeded_paths_repeat() {
        let scenario = MarketScenario::new("base", 0.06, 0.18).with_serial_correlation(0.7, 0.1);
        let a = scenario
            .sample_path(
                ReturnDistribution::Normal,
                24,
                &mut SmallRng::seed_from_u64(42),
            )
            .unwrap();
        let b = scenario
            .sample_path(
                ReturnDistribution::Normal,
                24,
                &mut SmallRng::seed_from_u64(42),
            )
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_rejects_bad_scenarios() {
        assert!(MarketScenario::new("ok", 0.06, 0.18).validate().is_ok());
        assert!(MarketScenario::new("", 0.06, 0.18).validate().is_err());
        assert!(MarketScenario::new("neg vol", 0.06, -0.1).validate().is_err());
        assert!(MarketScenario::new("ruin", -1.0, 0.1).validate().is_err());
        assert!(
            MarketScenario::new("rho", 0.06, 0.1)
                .with_serial_correlation(1.0, 0.0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_default_scenarios() {
        let names: Vec<_> = MarketScenario::defaults()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "base_case",
                "low_return",
                "high_volatility",
                "stagflation",
                "great_recession"
            ]
        );
    }
}

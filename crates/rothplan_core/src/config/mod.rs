//! Plan configuration
//!
//! `PlanConfig` holds everything a run needs: the age horizon, starting
//! balances, growth and inflation assumptions, tax law, the spending plan and
//! the conversion policy. It is read-only once built; every entry point calls
//! [`PlanConfig::validate`] before simulating.
//!
//! # Builder
//!
//! ```ignore
//! use rothplan_core::config::PlanBuilder;
//!
//! let plan = PlanBuilder::new()
//!     .ages(62, 85)
//!     .start_year(2026)
//!     .balances(1_250_000.0, 250_000.0, 300_000.0, 1_200_000.0)
//!     .growth_rate(0.06)
//!     .conversion_phase(62, 80_000.0)
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{
    AccountKind, AccountSnapshot, ConversionPolicy, ExpenseSchedule, SocialSecurity, TaxConfig,
};
use crate::taxes::validate_brackets;

pub mod builder;

pub use builder::PlanBuilder;

/// Complete input to a plan run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanConfig {
    pub start_age: u32,
    /// Last simulated age, inclusive
    pub end_age: u32,
    /// Calendar year in which the retiree is `start_age`
    pub start_year: i32,
    pub starting_balances: AccountSnapshot,
    /// Appreciates at the inflation rate; counted in net worth, never drawn
    pub home_equity: f64,
    pub inflation_rate: f64,
    /// Annual return used by deterministic runs
    pub nominal_growth_rate: f64,
    pub tax: TaxConfig,
    pub expenses: ExpenseSchedule,
    pub social_security: SocialSecurity,
    pub conversions: ConversionPolicy,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            start_age: 62,
            end_age: 85,
            start_year: 2026,
            starting_balances: AccountSnapshot::new(
                1_250_000.0,
                250_000.0,
                300_000.0,
                1_200_000.0,
            ),
            home_equity: 900_000.0,
            inflation_rate: 0.03,
            nominal_growth_rate: 0.06,
            tax: TaxConfig::default(),
            expenses: ExpenseSchedule::default(),
            social_security: SocialSecurity::default(),
            conversions: ConversionPolicy::default(),
        }
    }
}

fn check_amount(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidAmount { name, value })
    }
}

/// `value` must be finite and in `[min, max)`
fn check_rate(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value < max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

impl PlanConfig {
    /// Number of simulated years
    #[must_use]
    pub fn horizon_years(&self) -> usize {
        (self.end_age.saturating_sub(self.start_age) + 1) as usize
    }

    #[must_use]
    pub fn year_for_age(&self, age: u32) -> i32 {
        self.start_year + (age as i32 - self.start_age as i32)
    }

    /// Home equity in `year`, appreciated at inflation from the start year
    #[must_use]
    pub fn home_equity_in(&self, year: i32) -> f64 {
        self.home_equity * (1.0 + self.inflation_rate).powi(year - self.start_year)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end_age < self.start_age {
            return Err(ConfigError::AgeRange {
                start_age: self.start_age,
                end_age: self.end_age,
            });
        }

        for kind in AccountKind::ALL {
            let value = self.starting_balances.balance(kind);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeBalance {
                    account: kind.label(),
                    value,
                });
            }
        }
        check_amount("home_equity", self.home_equity)?;
        check_rate("inflation_rate", self.inflation_rate, -0.99, 1.0)?;
        check_rate("nominal_growth_rate", self.nominal_growth_rate, -1.0, 1.0)?;

        self.validate_tax()?;
        self.validate_expenses()?;
        self.validate_conversions()
    }

    fn validate_tax(&self) -> Result<(), ConfigError> {
        let tax = &self.tax;
        validate_brackets(&tax.brackets)?;
        check_amount("standard_deduction", tax.standard_deduction)?;
        check_rate("capital_gains_rate", tax.capital_gains_rate, 0.0, 1.0)?;
        check_rate("conversion_tax_rate", tax.conversion_tax_rate, 0.0, 1.0)?;
        check_rate("ira_withdrawal_tax_rate", tax.ira_withdrawal_tax_rate, 0.0, 1.0)?;
        if !(0.0..=1.0).contains(&tax.brokerage_gain_fraction) {
            return Err(ConfigError::InvalidRate {
                name: "brokerage_gain_fraction",
                value: tax.brokerage_gain_fraction,
            });
        }
        if let Some(ceiling) = tax.conversion_ceiling {
            check_amount("conversion_ceiling", ceiling)?;
        }
        Ok(())
    }

    fn validate_expenses(&self) -> Result<(), ConfigError> {
        check_amount("base_expense", self.expenses.base_expense)?;
        for expense in &self.expenses.one_time {
            check_amount("one_time_expense", expense.amount)?;
        }
        if let Some(travel) = self.expenses.travel {
            check_amount("travel_budget", travel.amount)?;
            if travel.end_age < travel.start_age {
                return Err(ConfigError::TravelWindow {
                    start_age: travel.start_age,
                    end_age: travel.end_age,
                });
            }
        }
        check_amount(
            "social_security_amount",
            self.social_security.annual_amount,
        )
    }

    fn validate_conversions(&self) -> Result<(), ConfigError> {
        let policy = &self.conversions;
        let first = policy.phases.first().ok_or(ConfigError::NoConversionPhases)?;
        if first.start_age > self.start_age {
            return Err(ConfigError::PhaseGap {
                start_age: self.start_age,
                first_phase_age: first.start_age,
            });
        }
        for (index, pair) in policy.phases.windows(2).enumerate() {
            if pair[1].start_age <= pair[0].start_age {
                return Err(ConfigError::PhasesNotAscending { index: index + 1 });
            }
        }
        for phase in &policy.phases {
            check_amount("conversion_target", phase.target)?;
        }
        check_amount("min_conversion", policy.min_conversion)?;

        let factor = policy.brokerage_liquidity_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(ConfigError::InvalidRate {
                name: "brokerage_liquidity_factor",
                value: factor,
            });
        }
        Ok(())
    }
}

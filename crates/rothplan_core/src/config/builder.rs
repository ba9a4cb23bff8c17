//! Plan Builder
//!
//! Fluent construction of a [`PlanConfig`] starting from the reference plan.
//! `build()` validates, so a plan that comes out of the builder is ready to run.
//!
//! # Example
//!
//! ```ignore
//! use rothplan_core::config::PlanBuilder;
//! use rothplan_core::model::TaxPolicy;
//!
//! let plan = PlanBuilder::new()
//!     .ages(62, 85)
//!     .balances(1_250_000.0, 250_000.0, 300_000.0, 1_200_000.0)
//!     .base_expense(60_000.0)
//!     .travel(20_000.0, 62, 70)
//!     .one_time_expense(64, 80_000.0)
//!     .social_security(67, 36_000.0)
//!     .clear_conversion_phases()
//!     .conversion_phase(62, 80_000.0)
//!     .conversion_phase(67, 60_000.0)
//!     .tax_policy(TaxPolicy::TrueMarginal)
//!     .build()?;
//! ```

use super::PlanConfig;
use crate::error::ConfigError;
use crate::model::{
    AccountSnapshot, ConversionPhase, OneTimeExpense, TaxBracket, TaxConfig, TaxPolicy,
    TravelBudget,
};

/// Builder for [`PlanConfig`]
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    config: PlanConfig,
}

impl PlanBuilder {
    /// Start from the reference plan
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing plan
    #[must_use]
    pub fn from_config(config: PlanConfig) -> Self {
        Self { config }
    }

    // =========================================================================
    // Horizon and balances
    // =========================================================================

    /// First and last simulated age, inclusive
    #[must_use]
    pub fn ages(mut self, start_age: u32, end_age: u32) -> Self {
        self.config.start_age = start_age;
        self.config.end_age = end_age;
        self
    }

    /// Calendar year of the first simulated age; also the expense inflation base year
    #[must_use]
    pub fn start_year(mut self, year: i32) -> Self {
        self.config.start_year = year;
        self.config.expenses.inflation_base_year = year;
        self
    }

    #[must_use]
    pub fn balances(mut self, ira: f64, roth: f64, savings: f64, brokerage: f64) -> Self {
        self.config.starting_balances = AccountSnapshot::new(ira, roth, savings, brokerage);
        self
    }

    #[must_use]
    pub fn home_equity(mut self, value: f64) -> Self {
        self.config.home_equity = value;
        self
    }

    #[must_use]
    pub fn inflation_rate(mut self, rate: f64) -> Self {
        self.config.inflation_rate = rate;
        self
    }

    #[must_use]
    pub fn growth_rate(mut self, rate: f64) -> Self {
        self.config.nominal_growth_rate = rate;
        self
    }

    // =========================================================================
    // Taxes
    // =========================================================================

    #[must_use]
    pub fn tax(mut self, tax: TaxConfig) -> Self {
        self.config.tax = tax;
        self
    }

    #[must_use]
    pub fn tax_policy(mut self, policy: TaxPolicy) -> Self {
        self.config.tax.policy = policy;
        self
    }

    #[must_use]
    pub fn brackets(mut self, brackets: Vec<TaxBracket>) -> Self {
        self.config.tax.brackets = brackets;
        self
    }

    #[must_use]
    pub fn standard_deduction(mut self, amount: f64) -> Self {
        self.config.tax.standard_deduction = amount;
        self
    }

    /// Flat rates for capital gains, conversions and IRA withdrawals
    #[must_use]
    pub fn flat_rates(mut self, capital_gains: f64, conversion: f64, ira_withdrawal: f64) -> Self {
        self.config.tax.capital_gains_rate = capital_gains;
        self.config.tax.conversion_tax_rate = conversion;
        self.config.tax.ira_withdrawal_tax_rate = ira_withdrawal;
        self
    }

    #[must_use]
    pub fn conversion_ceiling(mut self, ceiling: Option<f64>) -> Self {
        self.config.tax.conversion_ceiling = ceiling;
        self
    }

    // =========================================================================
    // Expenses and income
    // =========================================================================

    #[must_use]
    pub fn base_expense(mut self, amount: f64) -> Self {
        self.config.expenses.base_expense = amount;
        self
    }

    #[must_use]
    pub fn one_time_expense(mut self, age: u32, amount: f64) -> Self {
        self.config.expenses.one_time.push(OneTimeExpense {
            age,
            amount,
            label: None,
        });
        self
    }

    #[must_use]
    pub fn clear_one_time_expenses(mut self) -> Self {
        self.config.expenses.one_time.clear();
        self
    }

    #[must_use]
    pub fn travel(mut self, amount: f64, start_age: u32, end_age: u32) -> Self {
        self.config.expenses.travel = Some(TravelBudget {
            amount,
            start_age,
            end_age,
        });
        self
    }

    #[must_use]
    pub fn no_travel(mut self) -> Self {
        self.config.expenses.travel = None;
        self
    }

    #[must_use]
    pub fn social_security(mut self, start_age: u32, annual_amount: f64) -> Self {
        self.config.social_security.start_age = start_age;
        self.config.social_security.annual_amount = annual_amount;
        self
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Append a phase; phases must be added in ascending age order
    #[must_use]
    pub fn conversion_phase(mut self, start_age: u32, target: f64) -> Self {
        self.config
            .conversions
            .phases
            .push(ConversionPhase { start_age, target });
        self
    }

    #[must_use]
    pub fn clear_conversion_phases(mut self) -> Self {
        self.config.conversions.phases.clear();
        self
    }

    #[must_use]
    pub fn rmd_start_age(mut self, age: u32) -> Self {
        self.config.conversions.rmd_start_age = age;
        self
    }

    #[must_use]
    pub fn min_conversion(mut self, amount: f64) -> Self {
        self.config.conversions.min_conversion = amount;
        self
    }

    #[must_use]
    pub fn brokerage_liquidity_factor(mut self, factor: f64) -> Self {
        self.config.conversions.brokerage_liquidity_factor = factor;
        self
    }

    /// Validate and return the plan
    pub fn build(self) -> Result<PlanConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder_is_reference_plan() {
        let plan = PlanBuilder::new().build().unwrap();
        assert_eq!(plan, PlanConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let plan = PlanBuilder::new()
            .ages(65, 90)
            .start_year(2030)
            .balances(100.0, 200.0, 300.0, 400.0)
            .no_travel()
            .clear_one_time_expenses()
            .clear_conversion_phases()
            .conversion_phase(60, 0.0)
            .build()
            .unwrap();
        assert_eq!(plan.horizon_years(), 26);
        assert_eq!(plan.expenses.inflation_base_year, 2030);
        assert_eq!(plan.starting_balances.roth, 200.0);
        assert!(plan.expenses.travel.is_none());
        assert!(plan.expenses.one_time.is_empty());
    }

    #[test]
    fn test_build_validates() {
        let result = PlanBuilder::new().clear_conversion_phases().build();
        assert_eq!(result, Err(ConfigError::NoConversionPhases));
    }
}

//! Roth conversion sizing
//!
//! Turns the phase target for an age into an affordable conversion: capped at
//! the IRA balance, optionally at the bracket ceiling, scaled down until the
//! tax fits the liquid pool, and dropped entirely below the minimum.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError, InvalidInput};
use crate::model::{AccountSnapshot, ConversionPolicy, TaxConfig, TaxPolicy};
use crate::taxes::{bracket_tax, income_for_tax_budget, marginal_tax};
use crate::waterfall::IncomeEstimate;

/// What limited a year's conversion below its phase target
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversionLimit {
    /// Converted the full phase target
    #[default]
    None,
    /// Age is past the conversion window
    OutsideWindow,
    IraBalance,
    BracketCeiling,
    /// Tax would exceed the liquid pool
    Liquidity,
    BelowMinimum,
}

/// Outcome of sizing one year's conversion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversionDecision {
    pub target: f64,
    pub amount: f64,
    pub tax: f64,
    /// Liquidity counted toward paying the tax
    pub available_liquidity: f64,
    pub limit: ConversionLimit,
}

impl ConversionDecision {
    fn skipped(target: f64, available_liquidity: f64, limit: ConversionLimit) -> Self {
        Self {
            target,
            amount: 0.0,
            tax: 0.0,
            available_liquidity,
            limit,
        }
    }
}

/// Phase target for `age`, failing when no phase covers it
pub fn phase_target(policy: &ConversionPolicy, age: u32) -> Result<f64, ConfigError> {
    let first = policy.phases.first().ok_or(ConfigError::NoConversionPhases)?;
    policy.target_for(age).ok_or(ConfigError::PhaseGap {
        start_age: age,
        first_phase_age: first.start_age,
    })
}

fn conversion_tax(amount: f64, base_income: f64, tax: &TaxConfig) -> Result<f64, InvalidInput> {
    match tax.policy {
        TaxPolicy::FlatRateByCategory => Ok(amount * tax.conversion_tax_rate),
        TaxPolicy::TrueMarginal => {
            marginal_tax(amount, base_income, &tax.brackets, tax.standard_deduction)
        }
    }
}

/// Largest conversion whose tax fits `available`
fn affordable_amount(
    available: f64,
    base_income: f64,
    tax: &TaxConfig,
) -> Result<f64, InvalidInput> {
    match tax.policy {
        TaxPolicy::FlatRateByCategory if tax.conversion_tax_rate > 0.0 => {
            Ok(available / tax.conversion_tax_rate)
        }
        TaxPolicy::FlatRateByCategory => Ok(f64::INFINITY),
        TaxPolicy::TrueMarginal => income_for_tax_budget(
            available,
            base_income,
            &tax.brackets,
            tax.standard_deduction,
        ),
    }
}

/// Size the conversion for `age` against post-growth `balances`.
///
/// `income` is the ordinary income the year's withdrawals are expected to
/// realize. Its total sets the starting point for the bracket ceiling. Marginal
/// conversion tax stacks on the non-IRA share only, since the IRA withdrawal
/// is taxed above the conversion once the year is funded. The returned tax
/// never exceeds `savings + brokerage * brokerage_liquidity_factor`.
pub fn size_conversion(
    age: u32,
    balances: &AccountSnapshot,
    income: &IncomeEstimate,
    policy: &ConversionPolicy,
    tax: &TaxConfig,
) -> Result<ConversionDecision, EngineError> {
    let ira_withdrawal = InvalidInput::check_amount("ira_withdrawal", income.ira_withdrawal)?;
    let base_income = InvalidInput::check_amount("other_income", income.other)?;
    let ira = InvalidInput::check_amount("ira", balances.ira)?;
    let available = InvalidInput::check_amount(
        "available_liquidity",
        balances.savings + balances.brokerage * policy.brokerage_liquidity_factor,
    )?;

    if !policy.in_window(age) {
        return Ok(ConversionDecision::skipped(
            0.0,
            available,
            ConversionLimit::OutsideWindow,
        ));
    }

    let target = phase_target(policy, age)?;
    let mut amount = target;
    let mut limit = ConversionLimit::None;

    if ira < amount {
        amount = ira;
        limit = ConversionLimit::IraBalance;
    }

    if let Some(ceiling) = tax.conversion_ceiling {
        let room = (ceiling - tax.standard_deduction - base_income - ira_withdrawal).max(0.0);
        if room < amount {
            amount = room;
            limit = ConversionLimit::BracketCeiling;
        }
    }

    let mut owed = conversion_tax(amount, base_income, tax)?;
    if owed > available {
        amount = amount.min(affordable_amount(available, base_income, tax)?);
        owed = conversion_tax(amount, base_income, tax)?.min(available);
        limit = ConversionLimit::Liquidity;
    }

    if amount <= 0.0 || amount < policy.min_conversion {
        let limit = if amount > 0.0 {
            ConversionLimit::BelowMinimum
        } else {
            limit
        };
        return Ok(ConversionDecision::skipped(target, available, limit));
    }

    Ok(ConversionDecision {
        target,
        amount,
        tax: owed,
        available_liquidity: available,
        limit,
    })
}

/// Bracket headroom left once `conversion` is stacked on `other_income`
pub fn headroom_after(
    conversion: f64,
    other_income: f64,
    tax: &TaxConfig,
) -> Result<f64, InvalidInput> {
    bracket_tax(
        other_income + conversion,
        &tax.brackets,
        tax.standard_deduction,
    )
    .map(|b| b.headroom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConversionPhase, TaxBracket};

    fn balances() -> AccountSnapshot {
        AccountSnapshot::new(1_325_000.0, 265_000.0, 318_000.0, 1_272_000.0)
    }

    #[test]
    fn test_full_target_at_flat_rate() {
        let decision = size_conversion(
            62,
            &balances(),
            &IncomeEstimate::default(),
            &ConversionPolicy::default(),
            &TaxConfig::default(),
        )
        .unwrap();
        assert_eq!(decision.amount, 80_000.0);
        assert!((decision.tax - 17_600.0).abs() < 0.01, "Expected 17600, got {}", decision.tax);
        assert_eq!(decision.limit, ConversionLimit::None);
    }

    #[test]
    fn test_capped_at_ira_balance() {
        let small_ira = AccountSnapshot::new(25_000.0, 0.0, 100_000.0, 0.0);
        let decision = size_conversion(
            62,
            &small_ira,
            &IncomeEstimate::default(),
            &ConversionPolicy::default(),
            &TaxConfig::default(),
        )
        .unwrap();
        assert_eq!(decision.amount, 25_000.0);
        assert_eq!(decision.limit, ConversionLimit::IraBalance);
    }

    #[test]
    fn test_scaled_down_to_liquidity() {
        let tight = AccountSnapshot::new(1_000_000.0, 0.0, 11_000.0, 0.0);
        let decision = size_conversion(
            62,
            &tight,
            &IncomeEstimate::default(),
            &ConversionPolicy::default(),
            &TaxConfig::default(),
        )
        .unwrap();
        assert!(
            (decision.amount - 50_000.0).abs() < 0.01,
            "Expected 50000, got {}",
            decision.amount
        );
        assert!(decision.tax <= 11_000.0);
        assert_eq!(decision.limit, ConversionLimit::Liquidity);
    }

    #[test]
    fn test_liquidity_factor_discounts_brokerage() {
        let policy = ConversionPolicy {
            brokerage_liquidity_factor: 0.5,
            ..Default::default()
        };
        let only_brokerage = AccountSnapshot::new(1_000_000.0, 0.0, 0.0, 22_000.0);
        let decision = size_conversion(
            62,
            &only_brokerage,
            &IncomeEstimate::default(),
            &policy,
            &TaxConfig::default(),
        )
        .unwrap();
        assert!((decision.available_liquidity - 11_000.0).abs() < 0.01);
        assert!((decision.amount - 50_000.0).abs() < 0.01);
    }

    #[test]
    fn test_no_liquidity_means_no_conversion() {
        let illiquid = AccountSnapshot::new(1_000_000.0, 0.0, 0.0, 0.0);
        let decision = size_conversion(
            62,
            &illiquid,
            &IncomeEstimate::default(),
            &ConversionPolicy::default(),
            &TaxConfig::default(),
        )
        .unwrap();
        assert_eq!(decision.amount, 0.0);
        assert_eq!(decision.tax, 0.0);
    }

    #[test]
    fn test_below_minimum_is_skipped() {
        let tight = AccountSnapshot::new(1_000_000.0, 0.0, 1_100.0, 0.0);
        let decision = size_conversion(
            62,
            &tight,
            &IncomeEstimate::default(),
            &ConversionPolicy::default(),
            &TaxConfig::default(),
        )
        .unwrap();
        assert_eq!(decision.amount, 0.0);
        assert_eq!(decision.limit, ConversionLimit::BelowMinimum);
    }

    #[test]
    fn test_no_conversion_after_rmd_age() {
        let decision = size_conversion(
            74,
            &balances(),
            &IncomeEstimate::default(),
            &ConversionPolicy::default(),
            &TaxConfig::default(),
        )
        .unwrap();
        assert_eq!(decision.amount, 0.0);
        assert_eq!(decision.limit, ConversionLimit::OutsideWindow);
    }

    #[test]
    fn test_bracket_ceiling_caps_target() {
        let tax = TaxConfig {
            conversion_ceiling: Some(103_350.0),
            ..Default::default()
        };
        // 103,350 - 15,000 deduction - 40,000 estimated income
        let income = IncomeEstimate {
            ira_withdrawal: 30_000.0,
            other: 10_000.0,
        };
        let decision =
            size_conversion(62, &balances(), &income, &ConversionPolicy::default(), &tax)
                .unwrap();
        assert!(
            (decision.amount - 48_350.0).abs() < 0.01,
            "Expected 48350, got {}",
            decision.amount
        );
        assert_eq!(decision.limit, ConversionLimit::BracketCeiling);
    }

    #[test]
    fn test_exact_bracket_boundary_marginal() {
        let tax = TaxConfig {
            policy: TaxPolicy::TrueMarginal,
            brackets: vec![TaxBracket::new(0.0, 50_000.0, 0.10)],
            standard_deduction: 0.0,
            ..Default::default()
        };
        let policy = ConversionPolicy {
            phases: vec![ConversionPhase {
                start_age: 62,
                target: 50_000.0,
            }],
            ..Default::default()
        };
        let decision =
            size_conversion(62, &balances(), &IncomeEstimate::default(), &policy, &tax).unwrap();
        assert_eq!(decision.amount, 50_000.0);
        assert!((decision.tax - 5_000.0).abs() < 0.01, "Expected 5000, got {}", decision.tax);
        assert_eq!(headroom_after(decision.amount, 0.0, &tax).unwrap(), 0.0);
    }

    #[test]
    fn test_marginal_affordability_inverts_brackets() {
        let tax = TaxConfig {
            policy: TaxPolicy::TrueMarginal,
            brackets: vec![
                TaxBracket::new(0.0, 20_000.0, 0.10),
                TaxBracket::unbounded(20_000.0, 0.20),
            ],
            standard_deduction: 0.0,
            ..Default::default()
        };
        // 2,000 on the first 20k, remaining 2,000 buys 10k at 20%
        let tight = AccountSnapshot::new(1_000_000.0, 0.0, 4_000.0, 0.0);
        let decision = size_conversion(
            62,
            &tight,
            &IncomeEstimate::default(),
            &ConversionPolicy::default(),
            &tax,
        )
        .unwrap();
        assert!(
            (decision.amount - 30_000.0).abs() < 0.01,
            "Expected 30000, got {}",
            decision.amount
        );
        assert!(decision.tax <= 4_000.0);
    }

    #[test]
    fn test_marginal_tax_ignores_ira_withdrawal() {
        let tax = TaxConfig {
            policy: TaxPolicy::TrueMarginal,
            brackets: vec![
                TaxBracket::new(0.0, 20_000.0, 0.10),
                TaxBracket::unbounded(20_000.0, 0.20),
            ],
            standard_deduction: 0.0,
            ..Default::default()
        };
        let policy = ConversionPolicy {
            phases: vec![ConversionPhase {
                start_age: 62,
                target: 20_000.0,
            }],
            ..Default::default()
        };
        // The IRA withdrawal stacks above the conversion, so it does not push
        // the conversion into the 20% bracket
        let with_ira = IncomeEstimate {
            ira_withdrawal: 50_000.0,
            other: 0.0,
        };
        let decision = size_conversion(62, &balances(), &with_ira, &policy, &tax).unwrap();
        assert!((decision.tax - 2_000.0).abs() < 0.01, "Expected 2000, got {}", decision.tax);

        let with_gains = IncomeEstimate {
            ira_withdrawal: 0.0,
            other: 10_000.0,
        };
        let decision = size_conversion(62, &balances(), &with_gains, &policy, &tax).unwrap();
        assert!((decision.tax - 3_000.0).abs() < 0.01, "Expected 3000, got {}", decision.tax);
    }

    #[test]
    fn test_phase_gap_is_config_error() {
        let policy = ConversionPolicy {
            phases: vec![ConversionPhase {
                start_age: 65,
                target: 10_000.0,
            }],
            ..Default::default()
        };
        let err = size_conversion(
            62,
            &balances(),
            &IncomeEstimate::default(),
            &policy,
            &TaxConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Config(ConfigError::PhaseGap {
                start_age: 62,
                first_phase_age: 65
            })
        );
    }
}

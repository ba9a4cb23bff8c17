use serde::{Deserialize, Serialize};

/// One marginal bracket over taxable income (after the standard deduction).
///
/// `upper: None` marks the final, unbounded bracket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TaxBracket {
    pub lower: f64,
    pub upper: Option<f64>,
    pub rate: f64,
}

impl TaxBracket {
    #[must_use]
    pub fn new(lower: f64, upper: f64, rate: f64) -> Self {
        Self {
            lower,
            upper: Some(upper),
            rate,
        }
    }

    #[must_use]
    pub fn unbounded(lower: f64, rate: f64) -> Self {
        Self {
            lower,
            upper: None,
            rate,
        }
    }

    /// Upper bound, with the unbounded bracket extending to infinity
    #[must_use]
    pub fn upper_or_inf(&self) -> f64 {
        self.upper.unwrap_or(f64::INFINITY)
    }
}

/// How taxes on conversions and withdrawals are computed.
///
/// The two policies are kept apart on purpose; they produce different numbers
/// for the same plan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaxPolicy {
    /// Flat rate per category: conversions at `conversion_tax_rate`, brokerage
    /// withdrawals at `capital_gains_rate`, IRA withdrawals at `ira_withdrawal_tax_rate`.
    #[default]
    FlatRateByCategory,
    /// Conversions and IRA withdrawals taxed through the bracket schedule;
    /// brokerage withdrawals stay at the capital gains rate.
    TrueMarginal,
}

/// Tax law assumptions for a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaxConfig {
    pub policy: TaxPolicy,
    pub brackets: Vec<TaxBracket>,
    pub standard_deduction: f64,
    pub capital_gains_rate: f64,
    pub conversion_tax_rate: f64,
    pub ira_withdrawal_tax_rate: f64,
    /// Gross ordinary income the conversion should not push past (e.g. the top
    /// of the 22% bracket). `None` disables the headroom cap.
    pub conversion_ceiling: Option<f64>,
    /// Share of a brokerage withdrawal counted as ordinary income when
    /// estimating the year's income for the headroom cap
    pub brokerage_gain_fraction: f64,
}

impl TaxConfig {
    /// 2025 single-filer federal brackets
    #[must_use]
    pub fn single_filer_2025() -> Vec<TaxBracket> {
        vec![
            TaxBracket::new(0.0, 11_925.0, 0.10),
            TaxBracket::new(11_925.0, 48_475.0, 0.12),
            TaxBracket::new(48_475.0, 103_350.0, 0.22),
            TaxBracket::new(103_350.0, 197_300.0, 0.24),
            TaxBracket::new(197_300.0, 250_525.0, 0.32),
            TaxBracket::new(250_525.0, 626_350.0, 0.35),
            TaxBracket::unbounded(626_350.0, 0.37),
        ]
    }

    /// Rate used to gross up a brokerage withdrawal
    #[must_use]
    pub fn brokerage_rate(&self) -> f64 {
        self.capital_gains_rate
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            policy: TaxPolicy::FlatRateByCategory,
            brackets: Self::single_filer_2025(),
            standard_deduction: 15_000.0,
            capital_gains_rate: 0.15,
            conversion_tax_rate: 0.22,
            ira_withdrawal_tax_rate: 0.22,
            conversion_ceiling: None,
            brokerage_gain_fraction: 0.5,
        }
    }
}

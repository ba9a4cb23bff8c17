//! Account kinds and the per-run balance snapshot
//!
//! The four accounts have fixed tax treatments:
//! - IRA: tax-deferred, withdrawals and conversions taxed as ordinary income
//! - Roth: tax-free, never drawn by this policy
//! - Savings: cash, no tax on withdrawal
//! - Brokerage: taxable, withdrawals taxed at the capital gains rate

use serde::{Deserialize, Serialize};

/// Tax treatment bucket a balance belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Ira,
    Roth,
    Savings,
    Brokerage,
}

impl AccountKind {
    pub const ALL: [AccountKind; 4] = [
        AccountKind::Ira,
        AccountKind::Roth,
        AccountKind::Savings,
        AccountKind::Brokerage,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AccountKind::Ira => "IRA",
            AccountKind::Roth => "Roth",
            AccountKind::Savings => "Savings",
            AccountKind::Brokerage => "Brokerage",
        }
    }
}

/// Balances of all four accounts at one point in a simulated year.
///
/// A snapshot is created from the plan's starting balances and replaced by a
/// new value once per simulated year. Every field stays non-negative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountSnapshot {
    pub ira: f64,
    pub roth: f64,
    pub savings: f64,
    pub brokerage: f64,
}

impl AccountSnapshot {
    #[must_use]
    pub fn new(ira: f64, roth: f64, savings: f64, brokerage: f64) -> Self {
        Self {
            ira,
            roth,
            savings,
            brokerage,
        }
    }

    #[must_use]
    pub fn balance(&self, kind: AccountKind) -> f64 {
        match kind {
            AccountKind::Ira => self.ira,
            AccountKind::Roth => self.roth,
            AccountKind::Savings => self.savings,
            AccountKind::Brokerage => self.brokerage,
        }
    }

    /// Savings plus brokerage: the pool that pays conversion tax
    #[must_use]
    pub fn liquid(&self) -> f64 {
        self.savings + self.brokerage
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.ira + self.roth + self.savings + self.brokerage
    }

    /// Apply one year's growth factor to every balance.
    ///
    /// A factor below zero (a return worse than -100%) is clamped to zero.
    #[must_use]
    pub fn grown(&self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        Self {
            ira: self.ira * factor,
            roth: self.roth * factor,
            savings: self.savings * factor,
            brokerage: self.brokerage * factor,
        }
    }

    #[must_use]
    pub fn is_non_negative(&self) -> bool {
        AccountKind::ALL.iter().all(|k| self.balance(*k) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_applies_to_every_account() {
        let start = AccountSnapshot::new(1_250_000.0, 250_000.0, 300_000.0, 1_200_000.0);
        let grown = start.grown(1.06);
        assert!((grown.ira - 1_325_000.0).abs() < 0.01);
        assert!((grown.roth - 265_000.0).abs() < 0.01);
        assert!((grown.savings - 318_000.0).abs() < 0.01);
        assert!((grown.brokerage - 1_272_000.0).abs() < 0.01);
    }

    #[test]
    fn test_growth_factor_clamped_at_zero() {
        let start = AccountSnapshot::new(100.0, 100.0, 100.0, 100.0);
        let wiped = start.grown(-0.2);
        assert_eq!(wiped, AccountSnapshot::default());
        assert!(wiped.is_non_negative());
    }
}

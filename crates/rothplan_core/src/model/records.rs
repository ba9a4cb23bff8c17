//! Per-year output records
//!
//! Records are emitted once per simulated year and never mutated afterwards.
//! Reporting, export and plotting consume them as an ordered sequence.

use serde::{Deserialize, Serialize};

use super::accounts::AccountSnapshot;

/// Amount taken from one account: `gross` leaves the account, `net` reaches the need
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountDraw {
    pub gross: f64,
    pub net: f64,
}

impl AccountDraw {
    /// Tax withheld on the draw
    #[must_use]
    pub fn tax(&self) -> f64 {
        self.gross - self.net
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gross == 0.0
    }
}

/// Result of funding a need through the withdrawal waterfall.
///
/// There is deliberately no Roth field: the waterfall cannot draw from it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FundingBreakdown {
    pub savings: AccountDraw,
    pub brokerage: AccountDraw,
    pub ira: AccountDraw,
    /// Net need left over after every eligible account was exhausted
    pub unfunded: f64,
}

impl FundingBreakdown {
    /// Below this an unfunded remainder is rounding noise, not a shortfall
    pub const SHORTFALL_TOLERANCE: f64 = 0.005;

    #[must_use]
    pub fn is_shortfall(&self) -> bool {
        self.unfunded > Self::SHORTFALL_TOLERANCE
    }

    #[must_use]
    pub fn total_gross(&self) -> f64 {
        self.savings.gross + self.brokerage.gross + self.ira.gross
    }

    #[must_use]
    pub fn total_net(&self) -> f64 {
        self.savings.net + self.brokerage.net + self.ira.net
    }

    /// Tax withheld on brokerage and IRA draws
    #[must_use]
    pub fn total_tax(&self) -> f64 {
        self.savings.tax() + self.brokerage.tax() + self.ira.tax()
    }
}

/// How the year's conversion tax was paid out of liquid accounts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TaxPayment {
    pub from_savings: f64,
    pub from_brokerage: f64,
}

impl TaxPayment {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.from_savings + self.from_brokerage
    }
}

/// Everything that happened in one simulated year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearRecord {
    pub year: i32,
    pub age: u32,
    /// Return applied at the start of the year
    pub annual_return: f64,
    /// Balances after growth, before any conversion or withdrawal
    pub after_growth: AccountSnapshot,
    pub expenses_due: f64,
    pub social_security: f64,
    /// Social Security in excess of expenses; not carried forward
    pub social_security_surplus: f64,
    pub net_need: f64,
    /// Ordinary income estimated before the conversion was sized
    pub estimated_ordinary_income: f64,
    /// Taxable brokerage share of that estimate; the conversion stacks on it
    pub other_ordinary_income: f64,
    pub conversion_target: f64,
    pub conversion_amount: f64,
    pub conversion_tax: f64,
    pub conversion_tax_payment: TaxPayment,
    /// Bracket headroom left after the conversion and the IRA withdrawal
    pub bracket_headroom: f64,
    pub funding: FundingBreakdown,
    pub withdrawal_tax: f64,
    pub total_taxes: f64,
    pub ending: AccountSnapshot,
    pub home_equity: f64,
    pub net_worth: f64,
    pub shortfall: bool,
}

impl YearRecord {
    /// Unfunded part of this year's need
    #[must_use]
    pub fn unfunded(&self) -> f64 {
        self.funding.unfunded
    }

    /// Ending value of the four accounts, excluding home equity
    #[must_use]
    pub fn liquid_net_worth(&self) -> f64 {
        self.ending.total()
    }
}

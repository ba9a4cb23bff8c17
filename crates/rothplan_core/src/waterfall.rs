//! Withdrawal waterfall
//!
//! Funds a net need from savings, then brokerage, then the traditional IRA,
//! grossing up taxable draws so the net reaching the need is exact. The Roth
//! is not a candidate: when the three eligible accounts run dry the remainder
//! is reported as unfunded instead.

use crate::error::InvalidInput;
use crate::model::{
    AccountDraw, AccountSnapshot, FundingBreakdown, TaxBracket, TaxConfig, TaxPolicy,
};
use crate::taxes::{gross_from_net, gross_up_flat, marginal_tax};

/// How an IRA withdrawal is taxed
#[derive(Debug, Clone, Copy)]
pub enum IraCost<'a> {
    Flat(f64),
    /// Through the bracket schedule, on top of ordinary income already realized this year
    Marginal {
        brackets: &'a [TaxBracket],
        deduction: f64,
        base_income: f64,
    },
}

/// Per-account withdrawal cost for one funding pass
#[derive(Debug, Clone, Copy)]
pub struct WithdrawalCosts<'a> {
    pub brokerage_rate: f64,
    pub ira: IraCost<'a>,
}

impl<'a> WithdrawalCosts<'a> {
    /// Flat category rates regardless of policy
    #[must_use]
    pub fn flat(tax: &TaxConfig) -> Self {
        Self {
            brokerage_rate: tax.brokerage_rate(),
            ira: IraCost::Flat(tax.ira_withdrawal_tax_rate),
        }
    }

    /// Costs under the configured policy, with `ordinary_income` already
    /// realized this year (brokerage gains and the conversion)
    #[must_use]
    pub fn for_policy(tax: &'a TaxConfig, ordinary_income: f64) -> Self {
        match tax.policy {
            TaxPolicy::FlatRateByCategory => Self::flat(tax),
            TaxPolicy::TrueMarginal => Self {
                brokerage_rate: tax.brokerage_rate(),
                ira: IraCost::Marginal {
                    brackets: &tax.brackets,
                    deduction: tax.standard_deduction,
                    base_income: ordinary_income,
                },
            },
        }
    }
}

/// Draw from a flat-taxed account until `remaining` net is covered or the balance runs out
fn draw_flat(balance: f64, remaining: f64, rate: f64) -> AccountDraw {
    if remaining <= 0.0 || balance <= 0.0 {
        return AccountDraw::default();
    }
    let required = gross_up_flat(remaining, rate);
    if balance >= required {
        AccountDraw {
            gross: required,
            net: remaining,
        }
    } else {
        AccountDraw {
            gross: balance,
            net: balance * (1.0 - rate),
        }
    }
}

fn draw_ira(balance: f64, remaining: f64, cost: IraCost<'_>) -> Result<AccountDraw, InvalidInput> {
    match cost {
        IraCost::Flat(rate) => Ok(draw_flat(balance, remaining, rate)),
        IraCost::Marginal { .. } if remaining <= 0.0 || balance <= 0.0 => {
            Ok(AccountDraw::default())
        }
        IraCost::Marginal {
            brackets,
            deduction,
            base_income,
        } => {
            let required = gross_from_net(remaining, base_income, brackets, deduction)?;
            if balance >= required {
                Ok(AccountDraw {
                    gross: required,
                    net: remaining,
                })
            } else {
                let tax = marginal_tax(balance, base_income, brackets, deduction)?;
                Ok(AccountDraw {
                    gross: balance,
                    net: balance - tax,
                })
            }
        }
    }
}

/// Fund `need` from `balances` in savings, brokerage, IRA order.
///
/// Pure: the balances are not touched, apply the result with [`apply_funding`].
pub fn fund_need(
    need: f64,
    balances: &AccountSnapshot,
    costs: &WithdrawalCosts<'_>,
) -> Result<FundingBreakdown, InvalidInput> {
    let mut remaining = InvalidInput::check_amount("need", need)?;
    let savings = InvalidInput::check_amount("savings", balances.savings)?;
    let brokerage = InvalidInput::check_amount("brokerage", balances.brokerage)?;
    let ira = InvalidInput::check_amount("ira", balances.ira)?;

    let savings_draw = if remaining > 0.0 {
        let amount = savings.min(remaining);
        AccountDraw {
            gross: amount,
            net: amount,
        }
    } else {
        AccountDraw::default()
    };
    remaining -= savings_draw.net;

    let brokerage_draw = draw_flat(brokerage, remaining, costs.brokerage_rate);
    remaining -= brokerage_draw.net;

    let ira_draw = draw_ira(ira, remaining, costs.ira)?;
    remaining -= ira_draw.net;

    Ok(FundingBreakdown {
        savings: savings_draw,
        brokerage: brokerage_draw,
        ira: ira_draw,
        unfunded: remaining.max(0.0),
    })
}

/// Deduct each account's gross draw from `balances`
#[must_use]
pub fn apply_funding(balances: &AccountSnapshot, funding: &FundingBreakdown) -> AccountSnapshot {
    AccountSnapshot {
        ira: (balances.ira - funding.ira.gross).max(0.0),
        roth: balances.roth,
        savings: (balances.savings - funding.savings.gross).max(0.0),
        brokerage: (balances.brokerage - funding.brokerage.gross).max(0.0),
    }
}

/// Ordinary income the year's withdrawals are expected to realize, split so
/// the IRA share can be stacked above the conversion
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncomeEstimate {
    /// Gross IRA withdrawal
    pub ira_withdrawal: f64,
    /// Taxable share of the brokerage withdrawal
    pub other: f64,
}

impl IncomeEstimate {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.ira_withdrawal + self.other
    }
}

/// Estimate the year's ordinary income from a dry run of the waterfall at
/// flat rates: the IRA gross plus the taxable share of the brokerage gross
pub fn estimate_ordinary_income(
    need: f64,
    balances: &AccountSnapshot,
    tax: &TaxConfig,
) -> Result<IncomeEstimate, InvalidInput> {
    let funding = fund_need(need, balances, &WithdrawalCosts::flat(tax))?;
    Ok(IncomeEstimate {
        ira_withdrawal: funding.ira.gross,
        other: funding.brokerage.gross * tax.brokerage_gain_fraction,
    })
}

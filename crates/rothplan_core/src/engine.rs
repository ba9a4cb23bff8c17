//! Year-transition engine
//!
//! [`transition`] advances one year as a pure function of the plan, the
//! incoming balances and the year's return. Order within a year is fixed:
//!
//! 1. growth on all four balances
//! 2. expense and Social Security for the age
//! 3. net need, floored at zero
//! 4. conversion sized against pre-funding liquidity
//! 5. conversion tax paid from savings, then brokerage
//! 6. net need funded through the waterfall
//! 7. record emitted
//!
//! [`YearEngine`] threads the snapshot through the horizon and tracks the
//! `Active -> Terminal -> Closed` lifecycle.

use tracing::debug;

use crate::config::PlanConfig;
use crate::conversion::{headroom_after, size_conversion};
use crate::error::{EngineError, InvalidInput};
use crate::model::{AccountSnapshot, TaxPayment, YearRecord};
use crate::waterfall::{WithdrawalCosts, apply_funding, estimate_ordinary_income, fund_need};

/// Pay `amount` from savings first, then brokerage
fn pay_from_liquid(balances: &mut AccountSnapshot, amount: f64) -> TaxPayment {
    let from_savings = amount.min(balances.savings);
    balances.savings -= from_savings;
    let from_brokerage = (amount - from_savings).min(balances.brokerage).max(0.0);
    balances.brokerage -= from_brokerage;
    TaxPayment {
        from_savings,
        from_brokerage,
    }
}

/// Simulate one year at `age` in calendar `year` starting from `balances`.
///
/// The plan is assumed validated. A funding shortfall is not an error; it is
/// flagged on the record and the Roth is left alone.
pub fn transition(
    plan: &PlanConfig,
    balances: &AccountSnapshot,
    age: u32,
    year: i32,
    annual_return: f64,
) -> Result<(AccountSnapshot, YearRecord), EngineError> {
    if !annual_return.is_finite() {
        return Err(InvalidInput::NonFiniteAmount {
            name: "annual_return",
            value: annual_return,
        }
        .into());
    }

    let after_growth = balances.grown(1.0 + annual_return);

    let expenses_due = plan
        .expenses
        .expense_for(age, year, plan.inflation_rate);
    let social_security = plan.social_security.benefit_at(age);
    let net_need = (expenses_due - social_security).max(0.0);
    let social_security_surplus = (social_security - expenses_due).max(0.0);

    let income = estimate_ordinary_income(net_need, &after_growth, &plan.tax)?;
    let conversion = size_conversion(
        age,
        &after_growth,
        &income,
        &plan.conversions,
        &plan.tax,
    )?;

    let mut post_conversion = after_growth;
    post_conversion.ira -= conversion.amount;
    post_conversion.roth += conversion.amount;
    let conversion_tax_payment = pay_from_liquid(&mut post_conversion, conversion.tax);

    // The IRA withdrawal sits on top of the brokerage gains and the conversion
    let costs = WithdrawalCosts::for_policy(&plan.tax, income.other + conversion.amount);
    let funding = fund_need(net_need, &post_conversion, &costs)?;
    let ending = apply_funding(&post_conversion, &funding);

    debug_assert!(
        ending.roth >= after_growth.roth,
        "Roth balance decreased within year {year}"
    );
    debug_assert!(ending.is_non_negative(), "negative balance in year {year}");

    let bracket_headroom = headroom_after(
        conversion.amount + funding.ira.gross,
        income.other,
        &plan.tax,
    )?;
    let withdrawal_tax = funding.total_tax();
    let home_equity = plan.home_equity_in(year);
    let shortfall = funding.is_shortfall();

    debug!(
        year,
        age,
        annual_return,
        net_need,
        conversion = conversion.amount,
        conversion_tax = conversion.tax,
        limit = ?conversion.limit,
        unfunded = funding.unfunded,
        "year simulated"
    );

    let record = YearRecord {
        year,
        age,
        annual_return,
        after_growth,
        expenses_due,
        social_security,
        social_security_surplus,
        net_need,
        estimated_ordinary_income: income.total(),
        other_ordinary_income: income.other,
        conversion_target: conversion.target,
        conversion_amount: conversion.amount,
        conversion_tax: conversion.tax,
        conversion_tax_payment,
        bracket_headroom,
        funding,
        withdrawal_tax,
        total_taxes: conversion.tax + withdrawal_tax,
        ending,
        home_equity,
        net_worth: ending.total() + home_equity,
        shortfall,
    };

    Ok((ending, record))
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Years remain before the final age
    Active,
    /// The next step simulates the final age
    Terminal,
    /// Every year has been simulated
    Closed,
}

/// Drives [`transition`] across the plan's horizon, one year per [`step`](Self::step)
#[derive(Debug, Clone)]
pub struct YearEngine<'a> {
    plan: &'a PlanConfig,
    balances: AccountSnapshot,
    age: u32,
    year: i32,
    state: EngineState,
}

impl<'a> YearEngine<'a> {
    /// Start at the plan's first age with its starting balances.
    ///
    /// The plan must already be validated.
    #[must_use]
    pub fn new(plan: &'a PlanConfig) -> Self {
        let state = if plan.start_age >= plan.end_age {
            EngineState::Terminal
        } else {
            EngineState::Active
        };
        Self {
            plan,
            balances: plan.starting_balances,
            age: plan.start_age,
            year: plan.start_year,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn balances(&self) -> &AccountSnapshot {
        &self.balances
    }

    /// Age the next step will simulate
    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Simulate the next year with `annual_return`
    pub fn step(&mut self, annual_return: f64) -> Result<YearRecord, EngineError> {
        if self.state == EngineState::Closed {
            return Err(EngineError::Closed);
        }

        let (balances, record) =
            transition(self.plan, &self.balances, self.age, self.year, annual_return)?;
        self.balances = balances;

        if self.state == EngineState::Terminal {
            self.state = EngineState::Closed;
        } else {
            self.age += 1;
            self.year += 1;
            if self.age == self.plan.end_age {
                self.state = EngineState::Terminal;
            }
        }

        Ok(record)
    }
}

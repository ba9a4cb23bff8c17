//! Tax bracket calculator
//!
//! Progressive bracket math over ordinary income. Brackets are expressed in
//! taxable income (after the standard deduction); every function here takes
//! gross ordinary income plus the deduction and works out the rest.
//!
//! All functions are pure and validate their inputs, failing with
//! [`InvalidInput`] on negative or non-finite amounts and malformed brackets.

use crate::error::{BracketError, InvalidInput};
use crate::model::TaxBracket;

/// Bounds may differ by this much and still count as contiguous
const BOUND_EPSILON: f64 = 1e-9;

/// Tax owed on an income and the room left in its bracket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketTax {
    /// Income after the standard deduction, floored at zero
    pub taxable_income: f64,
    pub tax: f64,
    /// Additional ordinary income that can be realized before crossing into
    /// the next bracket. Infinite inside an unbounded top bracket.
    pub headroom: f64,
    pub marginal_rate: f64,
}

/// Check that brackets start at zero, ascend without gaps or overlaps, carry
/// rates in `[0, 1)` and that only the last one is unbounded
pub fn validate_brackets(brackets: &[TaxBracket]) -> Result<(), BracketError> {
    let first = brackets.first().ok_or(BracketError::Empty)?;
    if first.lower.abs() > BOUND_EPSILON {
        return Err(BracketError::NonZeroStart { lower: first.lower });
    }

    let last_index = brackets.len() - 1;
    for (index, bracket) in brackets.iter().enumerate() {
        if !bracket.rate.is_finite() || !(0.0..1.0).contains(&bracket.rate) {
            return Err(BracketError::InvalidRate {
                index,
                rate: bracket.rate,
            });
        }
        match bracket.upper {
            Some(upper) if upper.is_nan() || upper <= bracket.lower => {
                return Err(BracketError::Inverted { index });
            }
            None if index != last_index => return Err(BracketError::UnboundedNotLast { index }),
            _ => {}
        }
        if index > 0 {
            let prev_upper = brackets[index - 1].upper_or_inf();
            if (bracket.lower - prev_upper).abs() > BOUND_EPSILON {
                return Err(BracketError::Discontinuous { index });
            }
        }
    }
    Ok(())
}

/// Rate segments over gross ordinary income: the deduction at 0%, each
/// bracket shifted by the deduction, and the top rate continuing past a
/// bounded final bracket.
fn segments(
    brackets: &[TaxBracket],
    deduction: f64,
) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
    let beyond_top = brackets
        .last()
        .and_then(|b| b.upper.map(|upper| (deduction + upper, f64::INFINITY, b.rate)));

    std::iter::once((0.0, deduction, 0.0))
        .chain(
            brackets
                .iter()
                .map(move |b| (deduction + b.lower, deduction + b.upper_or_inf(), b.rate)),
        )
        .chain(beyond_top)
}

fn tax_on(income: f64, brackets: &[TaxBracket], deduction: f64) -> f64 {
    segments(brackets, deduction)
        .map(|(start, end, rate)| (income.min(end) - start).max(0.0) * rate)
        .sum()
}

/// Validate the schedule and hand back the checked deduction
fn check_schedule(brackets: &[TaxBracket], deduction: f64) -> Result<f64, InvalidInput> {
    validate_brackets(brackets)?;
    InvalidInput::check_amount("standard_deduction", deduction)
}

/// Tax owed on `income` of gross ordinary income and the headroom to the next bracket.
///
/// Income at or below the deduction owes nothing. An income exactly at a
/// bracket's upper bound belongs to that bracket and has zero headroom; income
/// past a bounded top bracket is taxed at the top rate with zero headroom.
pub fn bracket_tax(
    income: f64,
    brackets: &[TaxBracket],
    deduction: f64,
) -> Result<BracketTax, InvalidInput> {
    let income = InvalidInput::check_amount("income", income)?;
    let deduction = check_schedule(brackets, deduction)?;

    let taxable_income = (income - deduction).max(0.0);
    let tax = tax_on(income, brackets, deduction);

    let bracket = brackets
        .iter()
        .find(|b| taxable_income <= b.upper_or_inf());
    let (headroom, marginal_rate) = match bracket {
        // Measured from gross income so room still covered by the deduction counts too
        Some(b) => (b.upper_or_inf() - (income - deduction), b.rate),
        None => (0.0, brackets.last().map_or(0.0, |b| b.rate)),
    };

    Ok(BracketTax {
        taxable_income,
        tax,
        headroom,
        marginal_rate,
    })
}

/// Tax on `additional` ordinary income stacked on top of `base_income`
pub fn marginal_tax(
    additional: f64,
    base_income: f64,
    brackets: &[TaxBracket],
    deduction: f64,
) -> Result<f64, InvalidInput> {
    let additional = InvalidInput::check_amount("additional_income", additional)?;
    let base_income = InvalidInput::check_amount("base_income", base_income)?;
    let deduction = check_schedule(brackets, deduction)?;

    let with_additional = tax_on(base_income + additional, brackets, deduction);
    Ok(with_additional - tax_on(base_income, brackets, deduction))
}

/// Gross ordinary income needed on top of `base_income` to net `net_amount`
/// after marginal tax. The inverse of [`marginal_tax`].
pub fn gross_from_net(
    net_amount: f64,
    base_income: f64,
    brackets: &[TaxBracket],
    deduction: f64,
) -> Result<f64, InvalidInput> {
    let net_amount = InvalidInput::check_amount("net_amount", net_amount)?;
    let base_income = InvalidInput::check_amount("base_income", base_income)?;
    let deduction = check_schedule(brackets, deduction)?;

    let mut remaining_net = net_amount;
    let mut gross = 0.0;

    for (start, end, rate) in segments(brackets, deduction) {
        if remaining_net <= 0.0 {
            break;
        }
        let room = end - start.max(base_income);
        if room <= 0.0 {
            continue;
        }

        let net_per_gross = 1.0 - rate;
        let max_net_in_segment = room * net_per_gross;

        if remaining_net <= max_net_in_segment {
            gross += remaining_net / net_per_gross;
            remaining_net = 0.0;
        } else {
            gross += room;
            remaining_net -= max_net_in_segment;
        }
    }

    Ok(gross)
}

/// Largest additional ordinary income on top of `base_income` whose marginal
/// tax fits within `tax_budget`. Infinite when the remaining schedule is tax-free.
pub fn income_for_tax_budget(
    tax_budget: f64,
    base_income: f64,
    brackets: &[TaxBracket],
    deduction: f64,
) -> Result<f64, InvalidInput> {
    let mut budget = InvalidInput::check_amount("tax_budget", tax_budget)?;
    let base_income = InvalidInput::check_amount("base_income", base_income)?;
    let deduction = check_schedule(brackets, deduction)?;

    let mut income = 0.0;
    for (start, end, rate) in segments(brackets, deduction) {
        let room = end - start.max(base_income);
        if room <= 0.0 {
            continue;
        }
        if rate == 0.0 {
            income += room;
            continue;
        }

        let tax_room = room * rate;
        if budget <= tax_room {
            return Ok(income + budget / rate);
        }
        income += room;
        budget -= tax_room;
    }

    Ok(income)
}

/// Gross amount that nets `net_amount` after a flat `rate`
#[must_use]
pub fn gross_up_flat(net_amount: f64, rate: f64) -> f64 {
    net_amount / (1.0 - rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxConfig;

    fn test_brackets() -> Vec<TaxBracket> {
        vec![
            TaxBracket::new(0.0, 10_000.0, 0.10),
            TaxBracket::new(10_000.0, 40_000.0, 0.12),
            TaxBracket::new(40_000.0, 90_000.0, 0.22),
            TaxBracket::unbounded(90_000.0, 0.24),
        ]
    }

    #[test]
    fn test_tax_first_bracket() {
        let result = bracket_tax(5_000.0, &test_brackets(), 0.0).unwrap();
        assert!((result.tax - 500.0).abs() < 0.01, "Expected 500, got {}", result.tax);
        assert!((result.headroom - 5_000.0).abs() < 0.01);
        assert_eq!(result.marginal_rate, 0.10);
    }

    #[test]
    fn test_tax_multiple_brackets() {
        // $10,000 at 10% + $30,000 at 12% + $10,000 at 22% = $6,800
        let result = bracket_tax(50_000.0, &test_brackets(), 0.0).unwrap();
        assert!((result.tax - 6_800.0).abs() < 0.01, "Expected 6800, got {}", result.tax);
        assert!((result.headroom - 40_000.0).abs() < 0.01);
    }

    #[test]
    fn test_income_below_deduction_is_untaxed() {
        let result = bracket_tax(12_000.0, &test_brackets(), 15_000.0).unwrap();
        assert_eq!(result.tax, 0.0);
        assert_eq!(result.taxable_income, 0.0);
        // 3,000 still covered by the deduction plus the whole first bracket
        assert!((result.headroom - 13_000.0).abs() < 0.01, "Expected 13000, got {}", result.headroom);
    }

    #[test]
    fn test_exact_upper_bound_has_zero_headroom() {
        let brackets = vec![TaxBracket::new(0.0, 50_000.0, 0.10)];
        let result = bracket_tax(50_000.0, &brackets, 0.0).unwrap();
        assert!((result.tax - 5_000.0).abs() < 0.01, "Expected 5000, got {}", result.tax);
        assert_eq!(result.headroom, 0.0);
    }

    #[test]
    fn test_income_past_bounded_top_bracket() {
        let brackets = vec![TaxBracket::new(0.0, 50_000.0, 0.10)];
        let result = bracket_tax(60_000.0, &brackets, 0.0).unwrap();
        assert!((result.tax - 6_000.0).abs() < 0.01, "Expected 6000, got {}", result.tax);
        assert_eq!(result.headroom, 0.0);
        assert_eq!(result.marginal_rate, 0.10);
    }

    #[test]
    fn test_unbounded_top_bracket_has_infinite_headroom() {
        let result = bracket_tax(1_000_000.0, &test_brackets(), 0.0).unwrap();
        assert!(result.headroom.is_infinite());
    }

    #[test]
    fn test_single_filer_22_percent_headroom() {
        let config = TaxConfig::default();
        // 50,000 gross - 15,000 deduction = 35,000 taxable, in the 12% bracket
        let result = bracket_tax(50_000.0, &config.brackets, config.standard_deduction).unwrap();
        assert!((result.headroom - 13_475.0).abs() < 0.01, "Expected 13475, got {}", result.headroom);
        assert_eq!(result.marginal_rate, 0.12);
    }

    #[test]
    fn test_marginal_tax() {
        // $5,000 at 12% + $5,000 at 22% = $1,700
        let marginal = marginal_tax(10_000.0, 35_000.0, &test_brackets(), 0.0).unwrap();
        assert!((marginal - 1_700.0).abs() < 0.01, "Expected 1700, got {}", marginal);
    }

    #[test]
    fn test_gross_from_net_inverts_marginal_tax() {
        let brackets = test_brackets();
        let gross = gross_from_net(20_000.0, 30_000.0, &brackets, 5_000.0).unwrap();
        let tax = marginal_tax(gross, 30_000.0, &brackets, 5_000.0).unwrap();
        assert!(
            (gross - tax - 20_000.0).abs() < 0.01,
            "Expected net 20000, got {}",
            gross - tax
        );
    }

    #[test]
    fn test_income_for_tax_budget_inverts_marginal_tax() {
        let brackets = test_brackets();
        let income = income_for_tax_budget(3_000.0, 20_000.0, &brackets, 0.0).unwrap();
        // 20k of room at 12% is 2,400; the remaining 600 buys 2,727.27 at 22%
        assert!((income - 22_727.27).abs() < 0.01, "Expected 22727.27, got {}", income);
        let tax = marginal_tax(income, 20_000.0, &brackets, 0.0).unwrap();
        assert!((tax - 3_000.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_rate_schedule_is_unbounded_budget() {
        let brackets = vec![TaxBracket::unbounded(0.0, 0.0)];
        let income = income_for_tax_budget(0.0, 0.0, &brackets, 0.0).unwrap();
        assert!(income.is_infinite());
    }

    #[test]
    fn test_flat_gross_up() {
        let gross = gross_up_flat(85_000.0, 0.15);
        assert!((gross - 100_000.0).abs() < 0.01, "Expected 100000, got {}", gross);
    }

    #[test]
    fn test_rejects_malformed_brackets() {
        let overlapping = vec![
            TaxBracket::new(0.0, 10_000.0, 0.10),
            TaxBracket::new(9_000.0, 40_000.0, 0.12),
        ];
        assert_eq!(
            bracket_tax(1_000.0, &overlapping, 0.0),
            Err(InvalidInput::Brackets(BracketError::Discontinuous { index: 1 }))
        );

        let descending = vec![
            TaxBracket::new(0.0, 10_000.0, 0.10),
            TaxBracket::new(10_000.0, 5_000.0, 0.12),
        ];
        assert_eq!(
            validate_brackets(&descending),
            Err(BracketError::Inverted { index: 1 })
        );

        let unbounded_middle = vec![
            TaxBracket::unbounded(0.0, 0.10),
            TaxBracket::unbounded(10_000.0, 0.12),
        ];
        assert_eq!(
            validate_brackets(&unbounded_middle),
            Err(BracketError::UnboundedNotLast { index: 0 })
        );

        assert_eq!(validate_brackets(&[]), Err(BracketError::Empty));
        assert_eq!(
            validate_brackets(&[TaxBracket::new(100.0, 200.0, 0.1)]),
            Err(BracketError::NonZeroStart { lower: 100.0 })
        );
    }

    #[test]
    fn test_rejects_negative_income() {
        assert_eq!(
            bracket_tax(-1.0, &test_brackets(), 0.0),
            Err(InvalidInput::NegativeAmount {
                name: "income",
                value: -1.0
            })
        );
    }
}

//! Age-keyed schedules: expenses, Social Security and conversion phases

use serde::{Deserialize, Serialize};

/// A one-off expense in the year the retiree reaches `age` (base-year dollars)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OneTimeExpense {
    pub age: u32,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Annual travel budget active for ages `start_age..=end_age` (base-year dollars)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TravelBudget {
    pub amount: f64,
    pub start_age: u32,
    pub end_age: u32,
}

impl TravelBudget {
    #[must_use]
    pub fn is_active(&self, age: u32) -> bool {
        (self.start_age..=self.end_age).contains(&age)
    }
}

/// Spending plan. All amounts are in `inflation_base_year` dollars and are
/// inflated to the simulated year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExpenseSchedule {
    pub base_expense: f64,
    pub inflation_base_year: i32,
    pub one_time: Vec<OneTimeExpense>,
    pub travel: Option<TravelBudget>,
}

impl ExpenseSchedule {
    /// Total expense due for `age` in calendar `year`
    #[must_use]
    pub fn expense_for(&self, age: u32, year: i32, inflation_rate: f64) -> f64 {
        let factor = (1.0 + inflation_rate).powi(year - self.inflation_base_year);

        let travel = self
            .travel
            .filter(|t| t.is_active(age))
            .map_or(0.0, |t| t.amount);
        let one_time: f64 = self
            .one_time
            .iter()
            .filter(|e| e.age == age)
            .map(|e| e.amount)
            .sum();

        (self.base_expense + travel + one_time) * factor
    }
}

impl Default for ExpenseSchedule {
    fn default() -> Self {
        Self {
            base_expense: 60_000.0,
            inflation_base_year: 2026,
            one_time: vec![
                OneTimeExpense {
                    age: 63,
                    amount: 20_000.0,
                    label: Some("Car purchase".to_string()),
                },
                OneTimeExpense {
                    age: 64,
                    amount: 80_000.0,
                    label: Some("Home renovation".to_string()),
                },
            ],
            travel: Some(TravelBudget {
                amount: 20_000.0,
                start_age: 62,
                end_age: 70,
            }),
        }
    }
}

/// Social Security benefit: a fixed annual amount from `start_age` on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SocialSecurity {
    pub start_age: u32,
    pub annual_amount: f64,
}

impl SocialSecurity {
    #[must_use]
    pub fn benefit_at(&self, age: u32) -> f64 {
        if age >= self.start_age {
            self.annual_amount
        } else {
            0.0
        }
    }
}

impl Default for SocialSecurity {
    fn default() -> Self {
        Self {
            start_age: 67,
            annual_amount: 36_000.0,
        }
    }
}

/// Target annual conversion from `start_age` until the next phase begins
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConversionPhase {
    pub start_age: u32,
    pub target: f64,
}

/// Roth conversion policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversionPolicy {
    /// Ordered by `start_age`; the first phase covers the plan's start age and
    /// the last one extends to the end of the plan
    pub phases: Vec<ConversionPhase>,
    /// Conversions are evaluated only up to and including this age
    pub rmd_start_age: u32,
    /// A sized conversion smaller than this is skipped
    pub min_conversion: f64,
    /// Share of the brokerage balance counted as available to pay conversion tax
    pub brokerage_liquidity_factor: f64,
}

impl ConversionPolicy {
    /// Phase target for `age`: the last phase whose start is at or below `age`
    #[must_use]
    pub fn target_for(&self, age: u32) -> Option<f64> {
        self.phases
            .iter()
            .take_while(|p| p.start_age <= age)
            .last()
            .map(|p| p.target)
    }

    #[must_use]
    pub fn in_window(&self, age: u32) -> bool {
        age <= self.rmd_start_age
    }
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self {
            phases: vec![
                ConversionPhase {
                    start_age: 62,
                    target: 80_000.0,
                },
                ConversionPhase {
                    start_age: 67,
                    target: 60_000.0,
                },
                ConversionPhase {
                    start_age: 68,
                    target: 50_000.0,
                },
                ConversionPhase {
                    start_age: 73,
                    target: 30_000.0,
                },
            ],
            rmd_start_age: 73,
            min_conversion: 10_000.0,
            brokerage_liquidity_factor: 1.0,
        }
    }
}

//! Plain-text rendering of run results

use rothplan_core::model::{MonteCarloReport, PlanSummary, ScenarioSummary, YearRecord};

use crate::util::format::{format_compact_currency, format_currency, format_percentage};

const YEAR_HEADER: [&str; 11] = [
    "Year", "Age", "Return", "Expenses", "Convert", "Conv Tax", "IRA", "Roth", "Savings",
    "Brokerage", "Net Worth",
];
const YEAR_WIDTHS: [usize; 11] = [5, 4, 7, 11, 10, 9, 12, 12, 11, 12, 12];

fn table_row<S: AsRef<str>>(cells: &[S]) -> String {
    cells
        .iter()
        .zip(YEAR_WIDTHS)
        .map(|(cell, width)| format!("{:>width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One row per simulated year; shortfall years are marked with `!`
pub fn year_table(records: &[YearRecord]) -> String {
    let mut out = table_row(&YEAR_HEADER);
    out.push('\n');
    for r in records {
        let cells = [
            r.year.to_string(),
            r.age.to_string(),
            format_percentage(r.annual_return),
            format_currency(r.expenses_due),
            format_currency(r.conversion_amount),
            format_currency(r.conversion_tax),
            format_currency(r.ending.ira),
            format_currency(r.ending.roth),
            format_currency(r.ending.savings),
            format_currency(r.ending.brokerage),
            format_currency(r.net_worth),
        ];
        out.push_str(&table_row(&cells));
        if r.shortfall {
            out.push_str(" !");
        }
        out.push('\n');
    }
    out
}

pub fn plan_summary(summary: &PlanSummary) -> String {
    let rows = [
        ("Years simulated", summary.years.to_string()),
        ("Total converted", format_currency(summary.total_conversions)),
        ("Conversion tax", format_currency(summary.total_conversion_tax)),
        ("Withdrawal tax", format_currency(summary.total_withdrawal_tax)),
        ("Total taxes", format_currency(summary.total_taxes)),
        ("Roth withdrawals", format_currency(summary.total_roth_withdrawals)),
        ("Final Roth", format_currency(summary.final_balances.roth)),
        ("Final IRA", format_currency(summary.final_balances.ira)),
        ("Final liquid assets", format_currency(summary.final_liquid_assets)),
        ("Final net worth", format_currency(summary.final_net_worth)),
        ("Asset growth", format_currency(summary.asset_growth)),
        ("Tax-free share", format_percentage(summary.tax_free_share)),
    ];
    let mut out: String = rows
        .iter()
        .map(|(label, value)| format!("{label:<22}{value:>16}\n"))
        .collect();

    match summary.first_shortfall_age {
        Some(age) => out.push_str(&format!(
            "Shortfall in {} year(s), first at age {age}\n",
            summary.shortfall_years
        )),
        None => out.push_str("Every year funded without touching the Roth\n"),
    }
    out
}

fn scenario_block(summary: &ScenarioSummary) -> String {
    let scenario = &summary.scenario;
    let mut lines = vec![
        format!(
            "{} (mean {}, volatility {})",
            scenario.name,
            format_percentage(scenario.mean),
            format_percentage(scenario.volatility)
        ),
        format!(
            "  trials: {} completed, {} failed",
            summary.completed_trials, summary.failed_trials
        ),
        format!(
            "  shortfall probability: {}   Roth preserved: {}",
            format_percentage(summary.shortfall_probability),
            format_percentage(summary.roth_preservation_rate)
        ),
        format!(
            "  mean net worth: {}   mean conversions: {}   mean taxes: {}",
            format_compact_currency(summary.net_worth.mean),
            format_compact_currency(summary.mean_conversions),
            format_compact_currency(summary.mean_taxes)
        ),
    ];

    if !summary.roth_percentiles.is_empty() {
        lines.push(format!("  {:>6} {:>12} {:>12}", "pct", "Roth", "Net Worth"));
        for (&(p, roth), &(_, net_worth)) in summary
            .roth_percentiles
            .iter()
            .zip(&summary.net_worth_percentiles)
        {
            lines.push(format!(
                "  {:>5}% {:>12} {:>12}",
                p,
                format_compact_currency(roth),
                format_compact_currency(net_worth)
            ));
        }
    }

    lines.extend(summary.roth_thresholds.iter().map(|t| {
        format!(
            "  P(Roth >= {}): {}",
            format_compact_currency(t.target),
            format_percentage(t.probability)
        )
    }));
    lines.extend(summary.net_worth_thresholds.iter().map(|t| {
        format!(
            "  P(net worth >= {}): {}",
            format_compact_currency(t.target),
            format_percentage(t.probability)
        )
    }));

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

pub fn monte_carlo_report(report: &MonteCarloReport) -> String {
    let mut out = format!(
        "Monte Carlo: {} trials per scenario, seed {}, {:?} returns\n\n",
        report.trials_per_scenario, report.seed, report.distribution
    );
    for result in &report.scenarios {
        out.push_str(&scenario_block(&result.summary));
        out.push('\n');
    }
    if report.excluded_trials() > 0 {
        out.push_str(&format!(
            "{} trial(s) failed and were excluded from the statistics\n",
            report.excluded_trials()
        ));
    }
    out
}

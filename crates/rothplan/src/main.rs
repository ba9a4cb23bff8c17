use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{WrapErr, eyre};
use rothplan::util::io::atomic_write;
use rothplan::{PlanFile, init_logging, render};
use rothplan_core::model::{MonteCarloProgress, PlanSummary, ReturnDistribution};
use rothplan_core::{SeededSampler, monte_carlo, simulate_deterministic};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "rothplan")]
#[command(about = "Year-by-year Roth conversion planner with Monte Carlo stress tests")]
struct Args {
    /// Plan file (YAML); the reference plan is used when omitted
    #[arg(short, long, global = true)]
    plan: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Emit JSON instead of text tables
    #[arg(long, global = true)]
    json: bool,

    /// Write the report to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the plan at its fixed growth rate
    Deterministic {
        /// Override the plan's nominal growth rate
        #[arg(long)]
        growth: Option<f64>,

        /// Print only the run summary
        #[arg(long)]
        summary_only: bool,
    },
    /// Run a Monte Carlo batch over the configured market scenarios
    MonteCarlo {
        #[arg(long)]
        trials: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, value_enum)]
        distribution: Option<DistributionArg>,

        /// Only run the named scenario (repeatable)
        #[arg(long = "scenario")]
        scenarios: Vec<String>,

        /// Cap on worker threads
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Write the reference plan to a YAML file as a starting point
    Init {
        path: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DistributionArg {
    Normal,
    LogNormal,
}

impl From<DistributionArg> for ReturnDistribution {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Normal => ReturnDistribution::Normal,
            DistributionArg::LogNormal => ReturnDistribution::LogNormal,
        }
    }
}

fn load_plan(path: Option<&Path>) -> color_eyre::Result<PlanFile> {
    match path {
        Some(path) => PlanFile::load(path)
            .wrap_err_with(|| format!("failed to load plan from {}", path.display())),
        None => Ok(PlanFile::default()),
    }
}

fn to_json<T: Serialize>(value: &T) -> color_eyre::Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

fn emit(output: Option<&Path>, content: &str) -> color_eyre::Result<()> {
    match output {
        Some(path) => {
            atomic_write(path, content)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => print!("{content}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct DeterministicReport<'a> {
    summary: &'a PlanSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    years: Option<&'a [rothplan_core::model::YearRecord]>,
}

fn run_deterministic(
    args: &Args,
    mut file: PlanFile,
    growth: Option<f64>,
    summary_only: bool,
) -> color_eyre::Result<()> {
    if let Some(rate) = growth {
        file.plan.nominal_growth_rate = rate;
    }
    let plan = &file.plan;
    let records = simulate_deterministic(plan)?;
    let summary = PlanSummary::from_records(plan.starting_balances, &records);
    tracing::info!(
        years = summary.years,
        total_conversions = summary.total_conversions,
        shortfall_years = summary.shortfall_years,
        "deterministic run finished"
    );

    let content = if args.json {
        to_json(&DeterministicReport {
            summary: &summary,
            years: (!summary_only).then_some(records.as_slice()),
        })?
    } else if summary_only {
        render::plan_summary(&summary)
    } else {
        format!(
            "{}\n{}",
            render::year_table(&records),
            render::plan_summary(&summary)
        )
    };
    emit(args.output.as_deref(), &content)
}

fn run_monte_carlo(args: &Args, mut file: PlanFile, command: &Command) -> color_eyre::Result<()> {
    let Command::MonteCarlo {
        trials,
        seed,
        distribution,
        scenarios,
        threads,
    } = command
    else {
        return Err(eyre!("not a Monte Carlo command"));
    };

    let config = &mut file.monte_carlo;
    if let Some(trials) = trials {
        config.trials = *trials;
    }
    if let Some(seed) = seed {
        config.seed = *seed;
    }
    if let Some(distribution) = distribution {
        config.distribution = (*distribution).into();
    }
    if threads.is_some() {
        config.max_threads = *threads;
    }
    if !scenarios.is_empty() {
        if let Some(unknown) = scenarios
            .iter()
            .find(|name| !config.scenarios.iter().any(|s| &s.name == *name))
        {
            return Err(eyre!("unknown market scenario '{unknown}'"));
        }
        config.scenarios.retain(|s| scenarios.contains(&s.name));
    }

    let total = config.trials * config.scenarios.len();
    let progress = MonteCarloProgress::new();
    let done = AtomicBool::new(false);

    let report = std::thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(500));
                let completed = progress.completed();
                if completed < total && !done.load(Ordering::Relaxed) {
                    tracing::info!(completed, total, "Monte Carlo progress");
                }
            }
        });
        let report = monte_carlo(&file.plan, &file.monte_carlo, &SeededSampler, Some(&progress));
        done.store(true, Ordering::Relaxed);
        report
    })?;

    let content = if args.json {
        to_json(&report)?
    } else {
        render::monte_carlo_report(&report)
    };
    emit(args.output.as_deref(), &content)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    match &args.command {
        Command::Init { path } => {
            PlanFile::default().save(path)?;
            tracing::info!(path = %path.display(), "reference plan written");
        }
        Command::Deterministic {
            growth,
            summary_only,
        } => {
            let file = load_plan(args.plan.as_deref())?;
            run_deterministic(&args, file, *growth, *summary_only)?;
        }
        command @ Command::MonteCarlo { .. } => {
            let file = load_plan(args.plan.as_deref())?;
            run_monte_carlo(&args, file, command)?;
        }
    }

    Ok(())
}

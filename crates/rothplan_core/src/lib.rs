//! Roth conversion retirement planning library
//!
//! This crate projects a retiree's IRA, Roth, savings and brokerage balances
//! year by year under a rule-based conversion and withdrawal policy, and
//! stress-tests that policy with Monte Carlo market scenarios.
//! It supports:
//! - Progressive bracket taxation, alongside flat per-category rates
//! - Phase-based Roth conversions sized to bracket headroom and liquidity
//! - A savings, brokerage, IRA withdrawal waterfall that never draws the Roth
//! - Normal and log-normal return draws with optional serial correlation
//! - Parallel Monte Carlo batches with percentile bands and shortfall odds
//!
//! # Example
//!
//! ```ignore
//! use rothplan_core::config::PlanBuilder;
//! use rothplan_core::model::MonteCarloConfig;
//! use rothplan_core::simulation::{monte_carlo_simulate, simulate_deterministic};
//!
//! let plan = PlanBuilder::new().growth_rate(0.05).build()?;
//! let records = simulate_deterministic(&plan)?;
//! let report = monte_carlo_simulate(&plan, &MonteCarloConfig::default())?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod simulation;
pub mod taxes;
pub mod waterfall;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{PlanBuilder, PlanConfig};
pub use engine::{EngineState, YearEngine, transition};
pub use simulation::{
    FixedReturns, ReturnSampler, SeededSampler, TrialKey, monte_carlo, monte_carlo_simulate,
    simulate_deterministic, simulate_path,
};

//! Command-line front end for the Roth conversion planner
//!
//! Loads a plan from YAML, runs it deterministically or as a Monte Carlo
//! batch through `rothplan_core`, and renders the result as text tables or JSON.

pub mod logging;
pub mod plan_file;
pub mod render;
pub mod util;

pub use logging::init_logging;
pub use plan_file::{PlanFile, PlanFileError};

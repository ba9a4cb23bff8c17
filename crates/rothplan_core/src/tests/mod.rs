//! Integration tests for the rothplan engine
//!
//! Tests are organized by topic:
//! - `engine` - Year transitions, balance identities and the engine lifecycle
//! - `scenarios` - Reference runs with hand-checked numbers
//! - `monte_carlo` - Batch driver, aggregation, failure isolation and cancellation
//! - `properties` - Property tests for the plan-wide invariants

mod monte_carlo;
mod properties;

//! Compute module - grid storage, rules, stepping and pattern analysis.

mod analyzer;
mod census;
mod grid;
mod rule;
mod signature;
mod stepper;

pub use analyzer::*;
pub use census::*;
pub use grid::*;
pub use rule::*;
pub use signature::*;
pub use stepper::*;

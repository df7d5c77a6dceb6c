//! Schema module - configuration and pattern types.

mod config;
mod pattern;

pub use config::*;
pub use pattern::*;

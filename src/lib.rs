//! Life Engine - bit-packed Game of Life simulation and pattern analysis.
//!
//! This crate simulates Conway's Game of Life and other two-state
//! outer-totalistic automata on large bit-packed grids, stepping row bands in
//! parallel, and classifies seeded patterns as still lifes, oscillators,
//! spaceships, methuselahs or extinct.
//!
//! # Architecture
//!
//! - `schema`: configuration types and the pattern library
//! - `compute`: grid storage, rules, stepping, signatures and the analyzer
//! - `snapshot`: on-disk persistence of a generation
//!
//! # Example
//!
//! ```rust,no_run
//! use life_engine::{
//!     compute::{Boundary, PatternAnalyzer},
//!     schema::{AnalysisConfig, PatternLibrary},
//! };
//!
//! let library = PatternLibrary::standard();
//! let glider = library.get_by_name("glider")?;
//!
//! let analyzer = PatternAnalyzer::new(AnalysisConfig::new(1000, 20, Boundary::Wrap))?;
//! let result = analyzer.analyze_centered(glider)?;
//!
//! println!("{}", result.report());
//! # Ok::<(), life_engine::Error>(())
//! ```

pub mod compute;
pub mod error;
pub mod schema;
pub mod snapshot;

// Re-export commonly used types
pub use compute::{
    AnalysisResult, Boundary, Classification, Grid, PatternAnalyzer, Rule, Simulation,
    SimulationStats, Stepper,
};
pub use error::{Error, Result};
pub use schema::{AnalysisConfig, Pattern, PatternLibrary, SimulationConfig};

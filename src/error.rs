//! Error types shared across the engine.

use crate::compute::RuleError;
use crate::schema::ConfigError;

/// Convenience alias for engine results.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All errors surfaced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Grid dimensions must be non-zero (got {width}x{height})")]
    InvalidDimension { width: u32, height: u32 },
    #[error("Output grid {found} does not match input grid {expected}")]
    ShapeMismatch { expected: String, found: String },
    #[error("Corrupt grid data: {0}")]
    CorruptData(String),
    #[error("Unknown pattern '{name}'")]
    NotFound { name: String },
    #[error(
        "Pattern '{pattern}' ({width}x{height}) does not fit at ({x}, {y}) in a {grid_width}x{grid_height} grid"
    )]
    PatternOutOfBounds {
        pattern: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        grid_width: u32,
        grid_height: u32,
    },
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

//! Configuration types for simulations and pattern analysis.

use serde::{Deserialize, Serialize};

use crate::compute::{Boundary, Rule};

fn default_density() -> f64 {
    0.3
}

/// Settings for a free-running simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Edge policy.
    #[serde(default)]
    pub boundary: Boundary,
    /// Birth/survival rule, e.g. `"B3/S23"` or a preset name.
    #[serde(default)]
    pub rule: Rule,
    /// Fraction of cells alive after a random fill (0.0-1.0).
    #[serde(default = "default_density")]
    pub density: f64,
    /// Seed for the random fill. A fresh seed is drawn when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Library pattern to place centered instead of a random fill.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Rows per parallel band. Derived from the thread pool when absent.
    #[serde(default)]
    pub band_rows: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 50,
            boundary: Boundary::Wrap,
            rule: Rule::conway(),
            density: default_density(),
            random_seed: None,
            pattern: None,
            band_rows: None,
        }
    }
}

impl SimulationConfig {
    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(ConfigError::InvalidDensity(self.density));
        }
        if self.band_rows == Some(0) {
            return Err(ConfigError::InvalidBandRows);
        }
        Ok(())
    }
}

fn default_max_generations() -> u64 {
    1000
}

fn default_grid_side() -> u32 {
    100
}

fn default_methuselah_threshold() -> u64 {
    100
}

/// Settings for pattern classification runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Generation horizon: runs without a verdict by then are unresolved.
    #[serde(default = "default_max_generations")]
    pub max_generations: u64,
    /// Width of the analysis grid.
    #[serde(default = "default_grid_side")]
    pub grid_width: u32,
    /// Height of the analysis grid.
    #[serde(default = "default_grid_side")]
    pub grid_height: u32,
    #[serde(default)]
    pub boundary: Boundary,
    #[serde(default)]
    pub rule: Rule,
    /// A pattern whose first repeated shape appears at or after this
    /// generation is reported as a methuselah. Zero disables the check.
    #[serde(default = "default_methuselah_threshold")]
    pub methuselah_threshold: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_generations: default_max_generations(),
            grid_width: default_grid_side(),
            grid_height: default_grid_side(),
            boundary: Boundary::Wrap,
            rule: Rule::conway(),
            methuselah_threshold: default_methuselah_threshold(),
        }
    }
}

impl AnalysisConfig {
    /// Square analysis grid with the given horizon.
    pub fn new(max_generations: u64, grid_size: u32, boundary: Boundary) -> Self {
        Self {
            max_generations,
            grid_width: grid_size,
            grid_height: grid_size,
            boundary,
            ..Default::default()
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.max_generations == 0 {
            return Err(ConfigError::InvalidHorizon);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions (width, height) must be non-zero")]
    InvalidDimensions,
    #[error("Density {0} is outside 0.0-1.0")]
    InvalidDensity(f64),
    #[error("Band rows must be non-zero")]
    InvalidBandRows,
    #[error("Generation horizon must be non-zero")]
    InvalidHorizon,
    #[error("Unknown boundary '{0}' (expected wrap or fixed)")]
    UnknownBoundary(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_simulation_validation() {
        let config = SimulationConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDimensions)));

        let config = SimulationConfig {
            density: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDensity(_))));

        let config = SimulationConfig {
            density: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            band_rows: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBandRows)));
    }

    #[test]
    fn test_analysis_validation() {
        let config = AnalysisConfig {
            max_generations: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHorizon)));

        let config = AnalysisConfig::new(100, 0, Boundary::Fixed);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDimensions)));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"width": 64, "height": 32, "rule": "B36/S23"}"#).unwrap();
        assert_eq!(config.rule, Rule::highlife());
        assert_eq!(config.boundary, Boundary::Wrap);
        assert_eq!(config.density, 0.3);
        assert_eq!(config.random_seed, None);

        let analysis: AnalysisConfig =
            serde_json::from_str(r#"{"boundary": "fixed", "max_generations": 50}"#).unwrap();
        assert_eq!(analysis.boundary, Boundary::Fixed);
        assert_eq!(analysis.max_generations, 50);
        assert_eq!(analysis.grid_width, 100);
        assert_eq!(analysis.methuselah_threshold, 100);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = SimulationConfig {
            pattern: Some("glider".to_string()),
            random_seed: Some(42),
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let decoded: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.pattern.as_deref(), Some("glider"));
        assert_eq!(decoded.random_seed, Some(42));
        assert_eq!(decoded.width, config.width);
    }
}

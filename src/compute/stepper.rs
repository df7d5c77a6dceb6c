//! Generation stepper - advances a grid by one generation under a rule.
//!
//! The next generation is computed in row bands on the rayon pool. Each band
//! reads the previous generation (shared, read-only) and writes only its own
//! rows of the output buffer, so no locking is needed.

use log::trace;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{PatternLibrary, SimulationConfig};

use super::{BoundingBox, Boundary, Grid, Rule, WORD_BITS};

/// Bands per worker thread when the band size is derived automatically.
const BANDS_PER_THREAD: usize = 4;

/// Computes successive generations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stepper {
    /// Rows per parallel band. `None` derives it from the pool size.
    band_rows: Option<usize>,
}

impl Stepper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed number of rows per band (clamped to at least 1).
    pub fn with_band_rows(band_rows: usize) -> Self {
        Self {
            band_rows: Some(band_rows.max(1)),
        }
    }

    /// Rows per band for a grid of the given height.
    pub fn band_rows(&self, height: usize) -> usize {
        self.band_rows
            .unwrap_or_else(|| height.div_ceil(rayon::current_num_threads() * BANDS_PER_THREAD))
            .max(1)
    }

    /// Compute the next generation into a fresh grid.
    pub fn step(&self, grid: &Grid, rule: &Rule) -> Grid {
        let mut next = grid.empty_like();
        self.step_bands(grid, rule, &mut next);
        next
    }

    /// Compute the next generation of `src` into `dst`, overwriting it.
    ///
    /// Fails with [`Error::ShapeMismatch`] unless `dst` has the same
    /// dimensions and boundary policy as `src`.
    pub fn step_into(&self, src: &Grid, rule: &Rule, dst: &mut Grid) -> Result<()> {
        if src.dimensions() != dst.dimensions() || src.boundary() != dst.boundary() {
            return Err(Error::ShapeMismatch {
                expected: format!("{}x{} {}", src.width(), src.height(), src.boundary()),
                found: format!("{}x{} {}", dst.width(), dst.height(), dst.boundary()),
            });
        }
        self.step_bands(src, rule, dst);
        Ok(())
    }

    /// Banded parallel step. `dst` must have the shape of `src`.
    fn step_bands(&self, src: &Grid, rule: &Rule, dst: &mut Grid) {
        let stride = src.stride();
        let band_rows = self.band_rows(src.height() as usize);
        trace!(
            "Stepping {}x{} grid in bands of {} rows",
            src.width(),
            src.height(),
            band_rows
        );

        dst.words_mut()
            .par_chunks_mut(stride * band_rows)
            .enumerate()
            .for_each(|(band, out)| {
                let first_row = band * band_rows;
                for (offset, out_row) in out.chunks_exact_mut(stride).enumerate() {
                    next_row(src, rule, first_row + offset, out_row);
                }
            });
    }
}

/// Read one cell from a packed row.
#[inline(always)]
fn bit(row: &[u64], x: usize) -> u8 {
    ((row[x / WORD_BITS] >> (x % WORD_BITS)) & 1) as u8
}

/// Row `y + dy` under the boundary policy, `None` past a fixed edge.
#[inline]
fn neighbor_row(src: &Grid, y: usize, dy: isize) -> Option<&[u64]> {
    let height = src.height() as isize;
    let ny = y as isize + dy;
    if (0..height).contains(&ny) {
        Some(src.row(ny as usize))
    } else if src.boundary() == Boundary::Wrap {
        Some(src.row(ny.rem_euclid(height) as usize))
    } else {
        None
    }
}

/// Compute row `y` of the next generation into `out`.
fn next_row(src: &Grid, rule: &Rule, y: usize, out: &mut [u64]) {
    out.fill(0);

    let width = src.width() as usize;
    let wrap = src.boundary() == Boundary::Wrap;

    let above = neighbor_row(src, y, -1);
    let row = src.row(y);
    let below = neighbor_row(src, y, 1);

    for x in 0..width {
        let left = if x > 0 {
            Some(x - 1)
        } else if wrap {
            Some(width - 1)
        } else {
            None
        };
        let right = if x + 1 < width {
            Some(x + 1)
        } else if wrap {
            Some(0)
        } else {
            None
        };

        let mut count = 0u8;
        for r in [above, below].into_iter().flatten() {
            count += bit(r, x);
            count += left.map_or(0, |l| bit(r, l));
            count += right.map_or(0, |rx| bit(r, rx));
        }
        count += left.map_or(0, |l| bit(row, l));
        count += right.map_or(0, |rx| bit(row, rx));

        if rule.apply(bit(row, x) == 1, count) {
            out[x / WORD_BITS] |= 1u64 << (x % WORD_BITS);
        }
    }
}

/// Double-buffered simulation: the current generation plus a scratch buffer
/// that receives the next one, swapped after every step.
#[derive(Debug, Clone)]
pub struct Simulation {
    current: Grid,
    scratch: Grid,
    rule: Rule,
    stepper: Stepper,
    generation: u64,
}

impl Simulation {
    pub fn new(grid: Grid, rule: Rule) -> Self {
        Self::with_stepper(grid, rule, Stepper::new())
    }

    pub fn with_stepper(grid: Grid, rule: Rule, stepper: Stepper) -> Self {
        let scratch = grid.empty_like();
        Self {
            current: grid,
            scratch,
            rule,
            stepper,
            generation: 0,
        }
    }

    /// Build a simulation from configuration.
    ///
    /// A named pattern is placed centered; otherwise the grid is filled at
    /// `density` using `random_seed` (or a fresh random seed).
    pub fn from_config(config: &SimulationConfig, library: &PatternLibrary) -> Result<Self> {
        config.validate()?;

        let mut grid = Grid::new(config.width, config.height, config.boundary)?;
        match &config.pattern {
            Some(name) => {
                let pattern = library.get_by_name(name)?;
                let (x, y) = pattern.centered_offset(&grid)?;
                grid.place_pattern_checked(pattern, x, y)?;
            }
            None => {
                let seed = config.random_seed.unwrap_or_else(rand::random);
                grid.randomize(config.density, seed);
            }
        }

        let stepper = config
            .band_rows
            .map_or_else(Stepper::new, Stepper::with_band_rows);
        Ok(Self::with_stepper(grid, config.rule, stepper))
    }

    /// Advance one generation.
    pub fn step(&mut self) {
        // Scratch is built with `empty_like` and only ever swapped with current.
        self.stepper
            .step_bands(&self.current, &self.rule, &mut self.scratch);
        std::mem::swap(&mut self.current, &mut self.scratch);
        self.generation += 1;
    }

    /// Advance `generations` generations.
    pub fn run(&mut self, generations: u64) {
        for _ in 0..generations {
            self.step();
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.current
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Override the generation counter, e.g. when resuming from a snapshot.
    pub fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }
}

/// Per-generation statistics for status displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub generation: u64,
    pub population: u64,
    /// Fraction of live cells.
    pub density: f64,
    pub bounding_box: Option<BoundingBox>,
}

impl SimulationStats {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let grid = sim.grid();
        let population = grid.population();
        Self {
            generation: sim.generation(),
            population,
            density: population as f64 / grid.cell_count() as f64,
            bounding_box: grid.bounding_box(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PatternLibrary;

    /// Cell-by-cell reference step built on the public accessors.
    fn reference_step(grid: &Grid, rule: &Rule) -> Grid {
        let mut next = grid.empty_like();
        for y in 0..grid.height() as i64 {
            for x in 0..grid.width() as i64 {
                let alive = rule.apply(grid.get(x, y), grid.count_live_neighbors(x, y));
                next.set(x, y, alive);
            }
        }
        next
    }

    fn cells(grid: &Grid) -> Vec<(u32, u32)> {
        grid.live_cells().collect()
    }

    #[test]
    fn test_matches_reference() {
        let shapes = [(1, 1), (1, 5), (5, 1), (2, 2), (63, 7), (64, 9), (65, 11), (130, 3)];
        for boundary in [Boundary::Wrap, Boundary::Fixed] {
            for (seed, &(w, h)) in shapes.iter().enumerate() {
                let mut grid = Grid::new(w, h, boundary).unwrap();
                grid.randomize(0.4, seed as u64);

                for rule in [Rule::conway(), Rule::highlife(), Rule::seeds()] {
                    let expected = reference_step(&grid, &rule);
                    let actual = Stepper::new().step(&grid, &rule);
                    assert_eq!(actual, expected, "{}x{} {:?} {}", w, h, boundary, rule);
                }
            }
        }
    }

    #[test]
    fn test_band_size_does_not_matter() {
        let mut grid = Grid::new(97, 53, Boundary::Wrap).unwrap();
        grid.randomize(0.35, 9);
        let rule = Rule::conway();

        let expected = Stepper::with_band_rows(53).step(&grid, &rule);
        for band_rows in [1, 2, 7, 16, 100] {
            assert_eq!(Stepper::with_band_rows(band_rows).step(&grid, &rule), expected);
        }
        assert_eq!(Stepper::new().step(&grid, &rule), expected);
    }

    #[test]
    fn test_block_is_still() {
        let mut grid = Grid::new(10, 10, Boundary::Fixed).unwrap();
        for (x, y) in [(4, 4), (5, 4), (4, 5), (5, 5)] {
            grid.set(x, y, true);
        }

        let stepper = Stepper::new();
        let rule = Rule::conway();
        let g1 = stepper.step(&grid, &rule);
        let g2 = stepper.step(&g1, &rule);
        assert_eq!(cells(&g1), cells(&grid));
        assert_eq!(cells(&g2), cells(&grid));
    }

    #[test]
    fn test_blinker_period_two() {
        let mut grid = Grid::new(5, 5, Boundary::Fixed).unwrap();
        for y in 1..=3 {
            grid.set(2, y, true);
        }

        let stepper = Stepper::new();
        let rule = Rule::conway();
        let g1 = stepper.step(&grid, &rule);
        assert_eq!(cells(&g1), vec![(1, 2), (2, 2), (3, 2)]);
        assert_eq!(stepper.step(&g1, &rule), grid);
    }

    #[test]
    fn test_glider_wraps_around() {
        let library = PatternLibrary::standard();
        let glider = library.get_by_name("glider").unwrap();

        let mut grid = Grid::new(8, 8, Boundary::Wrap).unwrap();
        grid.place_pattern(glider, 0, 0);
        let start = grid.clone();

        // A glider moves one cell diagonally every 4 generations, so it
        // returns to its start on an 8x8 torus after 32.
        let mut sim = Simulation::new(grid, Rule::conway());
        sim.run(32);
        assert_eq!(sim.generation(), 32);
        assert_eq!(sim.grid(), &start);
    }

    #[test]
    fn test_fixed_edge_clips_blinker() {
        let edge_blinker = |boundary| {
            let mut grid = Grid::new(5, 5, boundary).unwrap();
            for x in 0..3 {
                grid.set(x, 0, true);
            }
            Simulation::new(grid, Rule::conway())
        };

        let mut fixed = edge_blinker(Boundary::Fixed);
        fixed.step();
        assert_eq!(cells(fixed.grid()), vec![(1, 0), (1, 1)]);
        fixed.step();
        assert_eq!(fixed.grid().population(), 0);

        let mut wrapped = edge_blinker(Boundary::Wrap);
        wrapped.run(2);
        assert_eq!(cells(wrapped.grid()), vec![(0, 0), (1, 0), (2, 0)]);
    }

    #[test]
    fn test_step_into_rejects_other_shapes() {
        let mut grid = Grid::new(8, 4, Boundary::Wrap).unwrap();
        grid.randomize(0.5, 1);
        let stepper = Stepper::new();
        let rule = Rule::conway();

        let others = [
            (8, 6, Boundary::Wrap),
            (8, 2, Boundary::Wrap),
            (8, 4, Boundary::Fixed),
        ];
        for (w, h, boundary) in others {
            let mut dst = Grid::new(w, h, boundary).unwrap();
            let before = dst.clone();
            assert!(matches!(
                stepper.step_into(&grid, &rule, &mut dst),
                Err(Error::ShapeMismatch { .. })
            ));
            assert_eq!(dst, before);
        }

        let mut dst = Grid::new(8, 4, Boundary::Wrap).unwrap();
        dst.randomize(1.0, 2);
        stepper.step_into(&grid, &rule, &mut dst).unwrap();
        assert_eq!(dst, stepper.step(&grid, &rule));
    }

    #[test]
    fn test_step_leaves_input_untouched() {
        let mut grid = Grid::new(16, 16, Boundary::Wrap).unwrap();
        grid.randomize(0.5, 3);
        let before = grid.clone();
        let _ = Stepper::new().step(&grid, &Rule::conway());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_simulation_from_config() {
        let library = PatternLibrary::standard();
        let config = SimulationConfig {
            width: 20,
            height: 20,
            pattern: Some("glider".to_string()),
            ..Default::default()
        };

        let sim = Simulation::from_config(&config, &library).unwrap();
        assert_eq!(sim.grid().population(), 5);

        let stats = SimulationStats::from_simulation(&sim);
        assert_eq!(stats.generation, 0);
        assert_eq!(stats.population, 5);
        assert!((stats.density - 5.0 / 400.0).abs() < 1e-12);
        let bbox = stats.bounding_box.unwrap();
        assert_eq!((bbox.width(), bbox.height()), (3, 3));
    }

    #[test]
    fn test_simulation_from_config_random() {
        let library = PatternLibrary::standard();
        let config = SimulationConfig {
            width: 32,
            height: 16,
            density: 1.0,
            random_seed: Some(5),
            ..Default::default()
        };

        let sim = Simulation::from_config(&config, &library).unwrap();
        assert_eq!(sim.grid().population(), 32 * 16);
    }

    #[test]
    fn test_simulation_from_config_unknown_pattern() {
        let library = PatternLibrary::standard();
        let config = SimulationConfig {
            pattern: Some("unicorn".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            Simulation::from_config(&config, &library),
            Err(crate::Error::NotFound { .. })
        ));
    }
}

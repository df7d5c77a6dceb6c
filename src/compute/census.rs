//! Identification of known formations in a grid.
//!
//! Live cells are grouped into clusters (cells within Chebyshev distance 2
//! of each other, so the separated arms of an oscillator like the pulsar stay
//! together). Each cluster is reduced to a canonical shape under the eight
//! symmetries of the square and looked up among the phases of the library's
//! still lifes, oscillators and spaceships.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::schema::{PatternCategory, PatternLibrary};

use super::{Boundary, Grid, Rule, Stepper};

/// Maximum Chebyshev distance between cells of one cluster.
const CLUSTER_REACH: i64 = 2;

/// Generations stepped per library pattern when collecting phases.
const PHASES: usize = 4;

/// Empty border around a pattern while its phases are collected.
const PHASE_MARGIN: u32 = 4;

/// Canonical cell list of a shape, origin at its bounding-box corner.
type Shape = Vec<(u32, u32)>;

/// Counts of identified formations in one grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    /// Formation name to number of occurrences.
    pub formations: BTreeMap<String, u64>,
    /// Clusters that matched no known formation.
    pub unidentified: u64,
}

impl Census {
    pub fn total_identified(&self) -> u64 {
        self.formations.values().sum()
    }
}

/// Lookup table from canonical shapes to formation names.
#[derive(Debug, Clone)]
pub struct FormationCensus {
    known: HashMap<Shape, String>,
}

impl FormationCensus {
    /// Collect every phase of the library's still lifes, oscillators and
    /// spaceships under `rule`. Earlier library entries win shape clashes.
    pub fn from_library(library: &PatternLibrary, rule: &Rule) -> Self {
        let stepper = Stepper::new();
        let mut known = HashMap::new();

        let candidates = library.iter().filter(|p| {
            matches!(
                p.category(),
                Some(
                    PatternCategory::StillLife
                        | PatternCategory::Oscillator
                        | PatternCategory::Spaceship
                )
            )
        });

        for pattern in candidates {
            let width = pattern.width() + 2 * PHASE_MARGIN;
            let height = pattern.height() + 2 * PHASE_MARGIN;
            let Ok(mut grid) = Grid::new(width, height, Boundary::Fixed) else {
                continue;
            };
            grid.place_pattern(pattern, PHASE_MARGIN as i64, PHASE_MARGIN as i64);

            for _ in 0..PHASES {
                if grid.is_empty() {
                    break;
                }
                let cells: Vec<(i64, i64)> = grid
                    .live_cells()
                    .map(|(x, y)| (x as i64, y as i64))
                    .collect();
                known
                    .entry(canonical_shape(&cells))
                    .or_insert_with(|| pattern.name().to_string());
                grid = stepper.step(&grid, rule);
            }
        }

        debug!("Formation census knows {} shapes", known.len());
        Self { known }
    }

    /// Name of the formation with exactly these cells, if known.
    pub fn lookup(&self, cells: &[(i64, i64)]) -> Option<&str> {
        self.known.get(&canonical_shape(cells)).map(String::as_str)
    }

    /// Cluster the grid's live cells and count the known formations.
    pub fn identify(&self, grid: &Grid) -> Census {
        let mut census = Census::default();
        for cluster in clusters(grid) {
            match self.lookup(&cluster) {
                Some(name) => *census.formations.entry(name.to_string()).or_insert(0) += 1,
                None => census.unidentified += 1,
            }
        }
        census
    }
}

/// Group live cells into clusters.
///
/// Coordinates are unwrapped while walking, so a cluster straddling a wrap
/// seam comes out contiguous.
fn clusters(grid: &Grid) -> Vec<Vec<(i64, i64)>> {
    let live: HashSet<(u32, u32)> = grid.live_cells().collect();
    let mut visited: HashSet<(u32, u32)> = HashSet::with_capacity(live.len());
    let mut result = Vec::new();

    for (sx, sy) in grid.live_cells() {
        if !visited.insert((sx, sy)) {
            continue;
        }

        let mut cluster = Vec::new();
        let mut stack = vec![(sx as i64, sy as i64)];
        while let Some((x, y)) = stack.pop() {
            cluster.push((x, y));
            for dy in -CLUSTER_REACH..=CLUSTER_REACH {
                for dx in -CLUSTER_REACH..=CLUSTER_REACH {
                    let (nx, ny) = (x + dx, y + dy);
                    let Some((rx, ry)) = grid.resolve(nx, ny) else {
                        continue;
                    };
                    let cell = (rx as u32, ry as u32);
                    if live.contains(&cell) && visited.insert(cell) {
                        stack.push((nx, ny));
                    }
                }
            }
        }
        result.push(cluster);
    }
    result
}

/// Smallest normalized cell list over the eight square symmetries.
fn canonical_shape(cells: &[(i64, i64)]) -> Shape {
    let transforms: [fn(i64, i64) -> (i64, i64); 8] = [
        |x, y| (x, y),
        |x, y| (-y, x),
        |x, y| (-x, -y),
        |x, y| (y, -x),
        |x, y| (-x, y),
        |x, y| (x, -y),
        |x, y| (y, x),
        |x, y| (-y, -x),
    ];

    transforms
        .iter()
        .map(|t| normalize(cells.iter().map(|&(x, y)| t(x, y))))
        .min()
        .unwrap_or_default()
}

fn normalize(cells: impl Iterator<Item = (i64, i64)>) -> Shape {
    let cells: Vec<(i64, i64)> = cells.collect();
    let min_x = cells.iter().map(|c| c.0).min().unwrap_or(0);
    let min_y = cells.iter().map(|c| c.1).min().unwrap_or(0);

    let mut shape: Shape = cells
        .iter()
        .map(|&(x, y)| ((x - min_x) as u32, (y - min_y) as u32))
        .collect();
    shape.sort_unstable_by_key(|&(x, y)| (y, x));
    shape
}

#[cfg(test)]
mod tests {
    use super::*;

    fn census() -> FormationCensus {
        FormationCensus::from_library(&PatternLibrary::standard(), &Rule::conway())
    }

    #[test]
    fn test_canonical_shape_symmetry() {
        let horizontal = [(0, 0), (1, 0), (2, 0)];
        let vertical = [(5, 5), (5, 6), (5, 7)];
        assert_eq!(canonical_shape(&horizontal), canonical_shape(&vertical));

        // Glider and its mirror image share a canonical form.
        let glider = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];
        let mirrored: Vec<_> = glider.iter().map(|&(x, y)| (-x, y)).collect();
        assert_eq!(canonical_shape(&glider), canonical_shape(&mirrored));
    }

    #[test]
    fn test_identify_mixed_grid() {
        let library = PatternLibrary::standard();
        let mut grid = Grid::new(40, 40, Boundary::Fixed).unwrap();
        grid.place_pattern(library.get_by_name("block").unwrap(), 2, 2);
        grid.place_pattern(library.get_by_name("block").unwrap(), 30, 30);
        grid.place_pattern(library.get_by_name("blinker").unwrap(), 15, 2);
        grid.place_pattern(library.get_by_name("beehive").unwrap(), 2, 20);
        grid.place_pattern(library.get_by_name("glider").unwrap(), 20, 20);

        let result = census().identify(&grid);
        assert_eq!(result.formations.get("block"), Some(&2));
        assert_eq!(result.formations.get("blinker"), Some(&1));
        assert_eq!(result.formations.get("beehive"), Some(&1));
        assert_eq!(result.formations.get("glider"), Some(&1));
        assert_eq!(result.unidentified, 0);
        assert_eq!(result.total_identified(), 5);
    }

    #[test]
    fn test_identify_other_phase() {
        // Horizontal blinker is the second phase of the library's vertical one.
        let mut grid = Grid::new(10, 10, Boundary::Fixed).unwrap();
        for x in 3..6 {
            grid.set(x, 4, true);
        }
        let result = census().identify(&grid);
        assert_eq!(result.formations.get("blinker"), Some(&1));
    }

    #[test]
    fn test_cluster_across_wrap_seam() {
        let mut grid = Grid::new(12, 12, Boundary::Wrap).unwrap();
        for (x, y) in [(11, 5), (0, 5), (11, 6), (0, 6)] {
            grid.set(x, y, true);
        }
        let result = census().identify(&grid);
        assert_eq!(result.formations.get("block"), Some(&1));
        assert_eq!(result.unidentified, 0);
    }

    #[test]
    fn test_pulsar_is_one_cluster() {
        let library = PatternLibrary::standard();
        let mut grid = Grid::new(30, 30, Boundary::Fixed).unwrap();
        grid.place_pattern(library.get_by_name("pulsar").unwrap(), 8, 8);

        let result = census().identify(&grid);
        assert_eq!(result.formations.get("pulsar"), Some(&1));
    }

    #[test]
    fn test_unknown_cluster() {
        let mut grid = Grid::new(10, 10, Boundary::Fixed).unwrap();
        grid.set(4, 4, true);
        let result = census().identify(&grid);
        assert!(result.formations.is_empty());
        assert_eq!(result.unidentified, 1);
    }

    #[test]
    fn test_empty_grid() {
        let grid = Grid::new(10, 10, Boundary::Wrap).unwrap();
        assert_eq!(census().identify(&grid), Census::default());
    }
}

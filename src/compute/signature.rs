//! Generation signatures for cycle and translation detection.
//!
//! A signature hashes the live-cell set twice: once in grid coordinates
//! (raw) and once relative to a shape origin (normalized). Two generations
//! with equal normalized signatures have the same shape; the difference
//! between their origins is the displacement.
//!
//! On a fixed grid the origin is the bounding-box corner. On a torus each
//! axis starts at the first occupied line after the longest cyclic run of
//! empty lines, so a shape split across the seam normalizes the same as an
//! unsplit copy.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{Boundary, Grid};

/// Content hash of one generation's live cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationSignature {
    /// Hash of the cell set in grid coordinates.
    pub raw: u64,
    /// Hash of the cell set translated so its shape origin is `(0, 0)`.
    pub normalized: u64,
    /// Shape origin in grid coordinates, `None` for an empty grid.
    pub origin: Option<(u32, u32)>,
    pub population: u64,
}

impl GenerationSignature {
    pub fn of(grid: &Grid) -> Self {
        let cells: Vec<(u32, u32)> = grid.live_cells().collect();
        let population = cells.len() as u64;
        let (width, height) = grid.dimensions();

        let mut raw = DefaultHasher::new();
        grid.dimensions().hash(&mut raw);
        population.hash(&mut raw);
        for cell in &cells {
            cell.hash(&mut raw);
        }

        // Ties between candidate origins go to the smallest normalized shape.
        let canonical = origin_candidates(&cells, width, height, grid.boundary())
            .into_iter()
            .map(|origin| (normalize(&cells, origin, width, height), origin))
            .min();

        let mut normalized = DefaultHasher::new();
        population.hash(&mut normalized);
        let origin = canonical.map(|(shape, origin)| {
            shape.hash(&mut normalized);
            origin
        });

        Self {
            raw: raw.finish(),
            normalized: normalized.finish(),
            origin,
            population,
        }
    }
}

/// Possible shape origins, one axis at a time.
fn origin_candidates(
    cells: &[(u32, u32)],
    width: u32,
    height: u32,
    boundary: Boundary,
) -> Vec<(u32, u32)> {
    let xs = axis_origins(cells.iter().map(|c| c.0), width, boundary);
    let ys = axis_origins(cells.iter().map(|c| c.1), height, boundary);
    xs.iter()
        .flat_map(|&x| ys.iter().map(move |&y| (x, y)))
        .collect()
}

fn axis_origins(coords: impl Iterator<Item = u32>, size: u32, boundary: Boundary) -> Vec<u32> {
    let mut occupied = vec![false; size as usize];
    for c in coords {
        occupied[c as usize] = true;
    }

    match boundary {
        Boundary::Fixed => occupied
            .iter()
            .position(|&o| o)
            .map(|i| i as u32)
            .into_iter()
            .collect(),
        Boundary::Wrap => seam_origins(&occupied),
    }
}

/// Occupied lines directly after the longest cyclic run of empty lines.
///
/// A fully occupied axis has no seam and starts at 0.
fn seam_origins(occupied: &[bool]) -> Vec<u32> {
    let n = occupied.len();
    if !occupied.contains(&true) {
        return Vec::new();
    }
    if !occupied.contains(&false) {
        return vec![0];
    }

    let mut longest = 0;
    let mut origins = Vec::new();
    for i in 0..n {
        if !occupied[i] || occupied[(i + n - 1) % n] {
            continue;
        }
        let gap = (1..n).take_while(|&k| !occupied[(i + n - k) % n]).count();
        if gap > longest {
            longest = gap;
            origins.clear();
        }
        if gap == longest {
            origins.push(i as u32);
        }
    }
    origins
}

/// Cells relative to `origin`, reduced modulo the grid, in row-major order.
fn normalize(
    cells: &[(u32, u32)],
    (ox, oy): (u32, u32),
    width: u32,
    height: u32,
) -> Vec<(u32, u32)> {
    let mut shape: Vec<(u32, u32)> = cells
        .iter()
        .map(|&(x, y)| {
            (
                (x as i64 - ox as i64).rem_euclid(width as i64) as u32,
                (y as i64 - oy as i64).rem_euclid(height as i64) as u32,
            )
        })
        .collect();
    shape.sort_unstable_by_key(|&(x, y)| (y, x));
    shape
}

/// A normalized signature seen for the second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repeat {
    /// Generation at which the shape was first seen.
    pub first_generation: u64,
    /// Generation at which it reappeared.
    pub generation: u64,
    /// `generation - first_generation`.
    pub period: u64,
    /// Origin translation over one period.
    pub displacement: (i64, i64),
}

impl Repeat {
    pub fn is_translated(&self) -> bool {
        self.displacement != (0, 0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    generation: u64,
    origin: Option<(u32, u32)>,
}

/// Maps normalized signatures to the generation they were first seen.
///
/// Memory grows with the number of distinct shapes observed, which is bounded
/// by the number of generations fed in.
#[derive(Debug, Clone)]
pub struct SignatureTracker {
    first_seen: HashMap<u64, Occurrence>,
    width: u32,
    height: u32,
    boundary: Boundary,
}

impl SignatureTracker {
    pub fn new(grid: &Grid) -> Self {
        Self {
            first_seen: HashMap::new(),
            width: grid.width(),
            height: grid.height(),
            boundary: grid.boundary(),
        }
    }

    /// Record a generation, returning the earlier occurrence of the same shape if any.
    ///
    /// The first occurrence is kept, so the smallest period is reported.
    pub fn observe(&mut self, generation: u64, signature: &GenerationSignature) -> Option<Repeat> {
        if let Some(seen) = self.first_seen.get(&signature.normalized) {
            return Some(Repeat {
                first_generation: seen.generation,
                generation,
                period: generation - seen.generation,
                displacement: self.displacement(seen.origin, signature.origin),
            });
        }

        self.first_seen.insert(
            signature.normalized,
            Occurrence {
                generation,
                origin: signature.origin,
            },
        );
        None
    }

    /// Number of distinct shapes recorded.
    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }

    /// Translation between two shape origins.
    ///
    /// On a torus each axis takes the shortest wrapped offset.
    fn displacement(&self, from: Option<(u32, u32)>, to: Option<(u32, u32)>) -> (i64, i64) {
        let (Some((x0, y0)), Some((x1, y1))) = (from, to) else {
            return (0, 0);
        };

        let dx = x1 as i64 - x0 as i64;
        let dy = y1 as i64 - y0 as i64;
        match self.boundary {
            Boundary::Fixed => (dx, dy),
            Boundary::Wrap => (
                shortest_wrap(dx, self.width as i64),
                shortest_wrap(dy, self.height as i64),
            ),
        }
    }
}

/// Representative of `delta` modulo `size` in `(-size/2, size/2]`.
fn shortest_wrap(delta: i64, size: i64) -> i64 {
    let d = delta.rem_euclid(size);
    if d > size / 2 { d - size } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(cells: &[(i64, i64)], boundary: Boundary) -> Grid {
        let mut grid = Grid::new(20, 20, boundary).unwrap();
        for &(x, y) in cells {
            grid.set(x, y, true);
        }
        grid
    }

    #[test]
    fn test_translation_keeps_normalized() {
        let a = GenerationSignature::of(&grid_with(&[(1, 1), (2, 1), (3, 2)], Boundary::Wrap));
        let b = GenerationSignature::of(&grid_with(&[(5, 7), (6, 7), (7, 8)], Boundary::Wrap));

        assert_eq!(a.normalized, b.normalized);
        assert_ne!(a.raw, b.raw);
        assert_eq!(a.origin, Some((1, 1)));
        assert_eq!(b.origin, Some((5, 7)));
    }

    #[test]
    fn test_shape_change_changes_normalized() {
        let a = GenerationSignature::of(&grid_with(&[(1, 1), (2, 1), (3, 1)], Boundary::Wrap));
        let b = GenerationSignature::of(&grid_with(&[(2, 0), (2, 1), (2, 2)], Boundary::Wrap));
        assert_ne!(a.normalized, b.normalized);
    }

    #[test]
    fn test_empty_signature() {
        let sig = GenerationSignature::of(&grid_with(&[], Boundary::Fixed));
        assert_eq!(sig.population, 0);
        assert_eq!(sig.origin, None);
    }

    #[test]
    fn test_tracker_reports_first_occurrence() {
        let grid = grid_with(&[(1, 1)], Boundary::Fixed);
        let mut tracker = SignatureTracker::new(&grid);
        let sig = GenerationSignature::of(&grid);

        assert_eq!(tracker.observe(0, &sig), None);
        let repeat = tracker.observe(3, &sig).unwrap();
        assert_eq!(repeat.first_generation, 0);
        assert_eq!(repeat.period, 3);
        assert!(!repeat.is_translated());

        // Still measured against generation 0.
        assert_eq!(tracker.observe(5, &sig).unwrap().period, 5);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_tracker_displacement() {
        let a = grid_with(&[(2, 2), (3, 2)], Boundary::Fixed);
        let b = grid_with(&[(4, 1), (5, 1)], Boundary::Fixed);
        let mut tracker = SignatureTracker::new(&a);

        tracker.observe(0, &GenerationSignature::of(&a));
        let repeat = tracker.observe(4, &GenerationSignature::of(&b)).unwrap();
        assert_eq!(repeat.displacement, (2, -1));
        assert!(repeat.is_translated());
    }

    #[test]
    fn test_wrap_displacement_is_shortest() {
        let a = grid_with(&[(18, 5)], Boundary::Wrap);
        let b = grid_with(&[(0, 5)], Boundary::Wrap);
        let mut tracker = SignatureTracker::new(&a);

        tracker.observe(0, &GenerationSignature::of(&a));
        let repeat = tracker.observe(4, &GenerationSignature::of(&b)).unwrap();
        assert_eq!(repeat.displacement, (2, 0));
    }

    #[test]
    fn test_split_shape_matches_unsplit() {
        let glider = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];
        let at = |ox: i64, oy: i64| {
            let cells: Vec<_> = glider.iter().map(|&(x, y)| (x + ox, y + oy)).collect();
            GenerationSignature::of(&grid_with(&cells, Boundary::Wrap))
        };

        let whole = at(5, 5);
        let split = at(18, 19);
        assert_eq!(split.normalized, whole.normalized);
        assert_eq!(split.origin, Some((18, 19)));

        let mut tracker = SignatureTracker::new(&grid_with(&[], Boundary::Wrap));
        tracker.observe(0, &split);
        let repeat = tracker.observe(4, &at(19, 0)).unwrap();
        assert_eq!(repeat.displacement, (1, 1));
    }

    #[test]
    fn test_seam_origins() {
        // Longest empty run is 5..=8, so the shape starts at 9.
        let occupied = [true, true, false, true, true, false, false, false, false, true];
        assert_eq!(seam_origins(&occupied), vec![9]);
        assert_eq!(seam_origins(&[false; 4]), Vec::<u32>::new());
        assert_eq!(seam_origins(&[true; 4]), vec![0]);
        assert_eq!(seam_origins(&[true, false, true, false]), vec![0, 2]);
    }

    #[test]
    fn test_shortest_wrap() {
        assert_eq!(shortest_wrap(19, 20), -1);
        assert_eq!(shortest_wrap(-19, 20), 1);
        assert_eq!(shortest_wrap(10, 20), 10);
        assert_eq!(shortest_wrap(0, 20), 0);
    }
}

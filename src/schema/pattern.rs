//! Seed patterns and the built-in pattern library.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compute::Grid;
use crate::error::{Error, Result};

/// Expected long-term behavior of a catalogued pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternCategory {
    StillLife,
    Oscillator,
    Spaceship,
    Gun,
    Methuselah,
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatternCategory::StillLife => "still life",
            PatternCategory::Oscillator => "oscillator",
            PatternCategory::Spaceship => "spaceship",
            PatternCategory::Gun => "gun",
            PatternCategory::Methuselah => "methuselah",
        })
    }
}

/// Serialized form of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<PatternCategory>,
    pub width: u32,
    pub height: u32,
    /// Live-cell offsets from the top-left corner.
    pub cells: Vec<(u32, u32)>,
}

/// Immutable named seed: a set of live cells inside a `width x height` box.
///
/// Cells are unique and kept in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PatternDescriptor", into = "PatternDescriptor")]
pub struct Pattern {
    name: String,
    description: String,
    category: Option<PatternCategory>,
    width: u32,
    height: u32,
    cells: Vec<(u32, u32)>,
}

impl Pattern {
    /// Build a pattern, rejecting empty boxes and cells outside the box.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        width: u32,
        height: u32,
        cells: impl IntoIterator<Item = (u32, u32)>,
    ) -> Result<Self> {
        let name = name.into();
        if width == 0 || height == 0 {
            return Err(Error::InvalidPattern(format!(
                "'{}' has an empty {}x{} footprint",
                name, width, height
            )));
        }

        let cells = canonical_cells(cells);
        if let Some(&(x, y)) = cells.iter().find(|&&(x, y)| x >= width || y >= height) {
            return Err(Error::InvalidPattern(format!(
                "'{}' cell ({}, {}) lies outside its {}x{} footprint",
                name, x, y, width, height
            )));
        }

        Ok(Self {
            name,
            description: description.into(),
            category: None,
            width,
            height,
            cells,
        })
    }

    /// Parse plaintext rows: `O` or `*` live, `.` dead, lines starting with `!` ignored.
    ///
    /// The footprint is the longest row by the number of rows.
    pub fn from_plaintext(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let mut description = Vec::new();
        let mut cells = Vec::new();
        let mut width = 0u32;
        let mut height = 0u32;

        for line in text.lines() {
            if let Some(comment) = line.strip_prefix('!') {
                let comment = comment.trim();
                if !comment.is_empty() && !comment.starts_with("Name:") {
                    description.push(comment.to_string());
                }
                continue;
            }

            let row = line.trim_end();
            for (x, c) in row.chars().enumerate() {
                match c {
                    'O' | 'o' | '*' => cells.push((x as u32, height)),
                    '.' => {}
                    other => {
                        return Err(Error::InvalidPattern(format!(
                            "'{}' has unexpected character '{}' on row {}",
                            name, other, height
                        )));
                    }
                }
            }
            width = width.max(row.chars().count() as u32);
            height += 1;
        }

        Self::new(name, description.join(" "), width, height, cells)
    }

    /// Attach an expected category.
    pub fn with_category(mut self, category: PatternCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Option<PatternCategory> {
        self.category
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Live cells, unique, in row-major order.
    pub fn cells(&self) -> &[(u32, u32)] {
        &self.cells
    }

    pub fn population(&self) -> usize {
        self.cells.len()
    }

    /// Offset that centers the footprint in `grid`.
    pub fn centered_offset(&self, grid: &Grid) -> Result<(u32, u32)> {
        let (gw, gh) = grid.dimensions();
        if self.width > gw || self.height > gh {
            return Err(Error::PatternOutOfBounds {
                pattern: self.name.clone(),
                x: 0,
                y: 0,
                width: self.width,
                height: self.height,
                grid_width: gw,
                grid_height: gh,
            });
        }
        Ok(((gw - self.width) / 2, (gh - self.height) / 2))
    }

    /// Plaintext rendering of the footprint.
    pub fn to_plaintext(&self) -> String {
        let mut rows = vec![vec!['.'; self.width as usize]; self.height as usize];
        for &(x, y) in &self.cells {
            rows[y as usize][x as usize] = 'O';
        }
        rows.into_iter()
            .map(|row| row.into_iter().collect::<String>() + "\n")
            .collect()
    }
}

/// Deduplicate and sort cells row-major.
fn canonical_cells(cells: impl IntoIterator<Item = (u32, u32)>) -> Vec<(u32, u32)> {
    let mut cells: Vec<(u32, u32)> = cells.into_iter().collect();
    cells.sort_unstable_by_key(|&(x, y)| (y, x));
    cells.dedup();
    cells
}

impl TryFrom<PatternDescriptor> for Pattern {
    type Error = Error;

    fn try_from(d: PatternDescriptor) -> Result<Self> {
        let pattern = Self::new(d.name, d.description, d.width, d.height, d.cells)?;
        Ok(Self {
            category: d.category,
            ..pattern
        })
    }
}

impl From<Pattern> for PatternDescriptor {
    fn from(p: Pattern) -> Self {
        Self {
            name: p.name,
            description: p.description,
            category: p.category,
            width: p.width,
            height: p.height,
            cells: p.cells,
        }
    }
}

/// Immutable catalog of named patterns, in insertion order.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    patterns: Vec<Pattern>,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

impl PatternLibrary {
    /// Catalog from explicit patterns. Names must be unique.
    pub fn from_patterns(patterns: Vec<Pattern>) -> Result<Self> {
        for (i, p) in patterns.iter().enumerate() {
            if patterns[..i].iter().any(|q| q.name == p.name) {
                return Err(Error::InvalidPattern(format!(
                    "duplicate pattern name '{}'",
                    p.name
                )));
            }
        }
        Ok(Self { patterns })
    }

    /// The built-in catalog.
    pub fn standard() -> Self {
        use PatternCategory::*;

        let patterns = vec![
            // Still lifes
            builtin(
                "block",
                "The most common still life",
                StillLife,
                (2, 2),
                &[(0, 0), (1, 0), (0, 1), (1, 1)],
            ),
            builtin(
                "beehive",
                "Six-cell still life",
                StillLife,
                (4, 3),
                &[(1, 0), (2, 0), (0, 1), (3, 1), (1, 2), (2, 2)],
            ),
            builtin(
                "loaf",
                "Seven-cell still life",
                StillLife,
                (4, 4),
                &[(1, 0), (2, 0), (0, 1), (3, 1), (1, 2), (3, 2), (2, 3)],
            ),
            builtin(
                "boat",
                "Five-cell still life",
                StillLife,
                (3, 3),
                &[(0, 0), (1, 0), (0, 1), (2, 1), (1, 2)],
            ),
            builtin(
                "tub",
                "Four-cell still life",
                StillLife,
                (3, 3),
                &[(1, 0), (0, 1), (2, 1), (1, 2)],
            ),
            // Oscillators
            builtin(
                "blinker",
                "The smallest oscillator, period 2",
                Oscillator,
                (3, 3),
                &[(1, 0), (1, 1), (1, 2)],
            ),
            builtin(
                "toad",
                "Period 2 oscillator",
                Oscillator,
                (4, 2),
                &[(1, 0), (2, 0), (3, 0), (0, 1), (1, 1), (2, 1)],
            ),
            builtin(
                "beacon",
                "Period 2 oscillator made of two diagonal blocks",
                Oscillator,
                (4, 4),
                &[(0, 0), (1, 0), (0, 1), (3, 2), (2, 3), (3, 3)],
            ),
            builtin(
                "pulsar",
                "Period 3 oscillator",
                Oscillator,
                (13, 13),
                &[
                    (2, 0), (3, 0), (4, 0), (8, 0), (9, 0), (10, 0),
                    (0, 2), (5, 2), (7, 2), (12, 2),
                    (0, 3), (5, 3), (7, 3), (12, 3),
                    (0, 4), (5, 4), (7, 4), (12, 4),
                    (2, 5), (3, 5), (4, 5), (8, 5), (9, 5), (10, 5),
                    (2, 7), (3, 7), (4, 7), (8, 7), (9, 7), (10, 7),
                    (0, 8), (5, 8), (7, 8), (12, 8),
                    (0, 9), (5, 9), (7, 9), (12, 9),
                    (0, 10), (5, 10), (7, 10), (12, 10),
                    (2, 12), (3, 12), (4, 12), (8, 12), (9, 12), (10, 12),
                ],
            ),
            // Spaceships
            builtin(
                "glider",
                "The smallest spaceship, moves diagonally at c/4",
                Spaceship,
                (3, 3),
                &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)],
            ),
            builtin(
                "lwss",
                "Lightweight spaceship, moves orthogonally at c/2",
                Spaceship,
                (5, 4),
                &[
                    (1, 0), (4, 0),
                    (0, 1),
                    (0, 2), (4, 2),
                    (0, 3), (1, 3), (2, 3), (3, 3),
                ],
            ),
            // Guns
            builtin(
                "glider_gun",
                "Gosper's glider gun, emits a glider every 30 generations",
                Gun,
                (36, 9),
                &[
                    (24, 0),
                    (22, 1), (24, 1),
                    (12, 2), (13, 2), (20, 2), (21, 2), (34, 2), (35, 2),
                    (11, 3), (15, 3), (20, 3), (21, 3), (34, 3), (35, 3),
                    (0, 4), (1, 4), (10, 4), (16, 4), (20, 4), (21, 4),
                    (0, 5), (1, 5), (10, 5), (14, 5), (16, 5), (17, 5), (22, 5), (24, 5),
                    (10, 6), (16, 6), (24, 6),
                    (11, 7), (15, 7),
                    (12, 8), (13, 8),
                ],
            ),
            // Methuselahs
            builtin(
                "r-pentomino",
                "Methuselah that settles after 1103 generations",
                Methuselah,
                (3, 3),
                &[(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)],
            ),
            builtin(
                "diehard",
                "Methuselah that vanishes after 130 generations",
                Methuselah,
                (8, 3),
                &[(6, 0), (0, 1), (1, 1), (1, 2), (5, 2), (6, 2), (7, 2)],
            ),
            builtin(
                "acorn",
                "Methuselah that settles after 5206 generations",
                Methuselah,
                (7, 3),
                &[(1, 0), (3, 1), (0, 2), (1, 2), (4, 2), (5, 2), (6, 2)],
            ),
        ];

        Self { patterns }
    }

    /// All patterns in insertion order.
    pub fn get_all_patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Case-sensitive exact lookup by canonical name.
    pub fn get_by_name(&self, name: &str) -> Result<&Pattern> {
        self.patterns
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn by_category(&self, category: PatternCategory) -> impl Iterator<Item = &Pattern> {
        self.patterns
            .iter()
            .filter(move |p| p.category == Some(category))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Built-in patterns are trusted constants and skip validation.
fn builtin(
    name: &str,
    description: &str,
    category: PatternCategory,
    (width, height): (u32, u32),
    cells: &[(u32, u32)],
) -> Pattern {
    Pattern {
        name: name.to_string(),
        description: description.to_string(),
        category: Some(category),
        width,
        height,
        cells: canonical_cells(cells.iter().copied()),
    }
}

//! Bit-packed two-state grid with boundary-aware accessors.
//!
//! Cells are stored one bit each in `u64` words. Every row starts on a fresh
//! word (`stride` words per row) so that disjoint row ranges own disjoint
//! slices of the buffer; the stepper relies on this to write row bands in
//! parallel. Bits past `width` in the last word of a row are always zero.

use std::fmt;
use std::str::FromStr;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{ConfigError, Pattern};

/// Bits per storage word.
pub const WORD_BITS: usize = 64;

/// Size of the serialized header: width(4) + height(4) + boundary(1).
pub const SERIALIZED_HEADER_SIZE: usize = 9;

/// Policy for coordinates outside `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Boundary {
    /// Toroidal: coordinates are reduced modulo width/height.
    #[default]
    Wrap = 0,
    /// Everything outside the grid is permanently dead.
    Fixed = 1,
}

impl Boundary {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Boundary::Wrap),
            1 => Some(Boundary::Fixed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Boundary::Wrap => "wrap",
            Boundary::Fixed => "fixed",
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Boundary {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wrap" | "torus" => Ok(Boundary::Wrap),
            "fixed" | "dead" => Ok(Boundary::Fixed),
            other => Err(ConfigError::UnknownBoundary(other.to_string()).into()),
        }
    }
}

/// Inclusive bounding box of the live cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    #[inline]
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Bit-packed 2D boolean field.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    boundary: Boundary,
    /// Words per row.
    stride: usize,
    words: Vec<u64>,
}

impl Grid {
    /// Create an all-dead grid. Fails if either dimension is zero.
    pub fn new(width: u32, height: u32, boundary: Boundary) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }

        let stride = (width as usize).div_ceil(WORD_BITS);
        Ok(Self {
            width,
            height,
            boundary,
            stride,
            words: vec![0; stride * height as usize],
        })
    }

    /// All-dead grid with the same shape and boundary policy.
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            boundary: self.boundary,
            stride: self.stride,
            words: vec![0; self.words.len()],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub(crate) fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub(crate) fn row(&self, y: usize) -> &[u64] {
        &self.words[y * self.stride..(y + 1) * self.stride]
    }

    #[inline]
    pub(crate) fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    /// Resolve a possibly out-of-range coordinate under the boundary policy.
    #[inline]
    pub fn resolve(&self, x: i64, y: i64) -> Option<(usize, usize)> {
        let (w, h) = (self.width as i64, self.height as i64);
        match self.boundary {
            Boundary::Wrap => Some((x.rem_euclid(w) as usize, y.rem_euclid(h) as usize)),
            Boundary::Fixed if (0..w).contains(&x) && (0..h).contains(&y) => {
                Some((x as usize, y as usize))
            }
            Boundary::Fixed => None,
        }
    }

    #[inline]
    fn bit(&self, x: usize, y: usize) -> bool {
        self.words[y * self.stride + x / WORD_BITS] & (1u64 << (x % WORD_BITS)) != 0
    }

    #[inline]
    fn put(&mut self, x: usize, y: usize, value: bool) {
        let word = &mut self.words[y * self.stride + x / WORD_BITS];
        let mask = 1u64 << (x % WORD_BITS);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Cell state. Out-of-range coordinates follow the boundary policy.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> bool {
        self.resolve(x, y).is_some_and(|(x, y)| self.bit(x, y))
    }

    /// Set a cell. No-op outside a fixed grid.
    pub fn set(&mut self, x: i64, y: i64, value: bool) {
        if let Some((x, y)) = self.resolve(x, y) {
            self.put(x, y, value);
        }
    }

    /// Flip a cell. No-op outside a fixed grid.
    pub fn toggle(&mut self, x: i64, y: i64) {
        if let Some((x, y)) = self.resolve(x, y) {
            self.words[y * self.stride + x / WORD_BITS] ^= 1u64 << (x % WORD_BITS);
        }
    }

    /// Live cells among the 8 Moore neighbors, resolved like [`Grid::get`].
    pub fn count_live_neighbors(&self, x: i64, y: i64) -> u8 {
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx != 0 || dy != 0) && self.get(x + dx, y + dy) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Fill every cell independently with probability `density`.
    ///
    /// `density` is clamped to `[0, 1]` (NaN counts as 0). The fill visits
    /// cells in row-major order from a generator seeded with `seed`, so the
    /// result depends only on the seed.
    pub fn randomize(&mut self, density: f64, seed: u64) {
        let density = if density.is_nan() {
            0.0
        } else {
            density.clamp(0.0, 1.0)
        };
        let mut rng = StdRng::seed_from_u64(seed);

        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                let alive = rng.gen_bool(density);
                self.put(x, y, alive);
            }
        }
    }

    /// OR a pattern into the grid at the given offset.
    ///
    /// Each cell goes through the boundary policy: wrapped on a torus,
    /// dropped outside a fixed grid. Existing live cells are kept.
    pub fn place_pattern(&mut self, pattern: &Pattern, origin_x: i64, origin_y: i64) {
        for &(px, py) in pattern.cells() {
            self.set(origin_x + px as i64, origin_y + py as i64, true);
        }
    }

    /// Check that the pattern's whole footprint fits at `(x, y)`.
    pub fn check_fits(&self, pattern: &Pattern, x: u32, y: u32) -> Result<()> {
        let fits_x = x as u64 + pattern.width() as u64 <= self.width as u64;
        let fits_y = y as u64 + pattern.height() as u64 <= self.height as u64;
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(Error::PatternOutOfBounds {
                pattern: pattern.name().to_string(),
                x,
                y,
                width: pattern.width(),
                height: pattern.height(),
                grid_width: self.width,
                grid_height: self.height,
            })
        }
    }

    /// Place a pattern whose footprint must lie inside the grid.
    ///
    /// The grid is left untouched when the footprint does not fit.
    pub fn place_pattern_checked(&mut self, pattern: &Pattern, x: u32, y: u32) -> Result<()> {
        self.check_fits(pattern, x, y)?;
        self.place_pattern(pattern, x as i64, y as i64);
        Ok(())
    }

    /// Kill every cell.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Number of live cells.
    pub fn population(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Live cell coordinates in row-major order.
    pub fn live_cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.words
            .chunks_exact(self.stride)
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter().enumerate().flat_map(move |(i, &word)| {
                    SetBits(word).map(move |bit| ((i * WORD_BITS + bit) as u32, y as u32))
                })
            })
    }

    /// Bounding box of the live cells, `None` when the grid is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.live_cells().fold(None, |bbox, (x, y)| {
            Some(match bbox {
                None => BoundingBox {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            })
        })
    }

    /// New grid of a different size holding the cells that still fit.
    pub fn resized(&self, width: u32, height: u32) -> Result<Self> {
        let mut grid = Self::new(width, height, self.boundary)?;
        for (x, y) in self.live_cells() {
            if x < width && y < height {
                grid.put(x as usize, y as usize, true);
            }
        }
        Ok(grid)
    }

    /// Number of payload bytes for a `width x height` grid, padded to whole words.
    fn payload_len(width: u32, height: u32) -> u64 {
        (width as u64 * height as u64).div_ceil(WORD_BITS as u64) * (WORD_BITS as u64 / 8)
    }

    /// Encode as `[width u32][height u32][boundary u8][bits]`, little-endian.
    ///
    /// Bit `i` of payload byte `i / 8` (LSB first) is cell `(i % width, i / width)`.
    /// The payload is padded with zero bits to a whole number of words.
    pub fn serialize(&self) -> Vec<u8> {
        let payload = Self::payload_len(self.width, self.height) as usize;
        let mut bytes = vec![0u8; SERIALIZED_HEADER_SIZE + payload];

        bytes[0..4].copy_from_slice(&self.width.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.height.to_le_bytes());
        bytes[8] = self.boundary as u8;

        let bits = &mut bytes[SERIALIZED_HEADER_SIZE..];
        for (x, y) in self.live_cells() {
            let i = y as usize * self.width as usize + x as usize;
            bits[i / 8] |= 1 << (i % 8);
        }
        bytes
    }

    /// Decode bytes produced by [`Grid::serialize`].
    ///
    /// Any length mismatch, unknown boundary tag, zero dimension or set
    /// padding bit is reported as [`Error::CorruptData`]; nothing is
    /// returned from a partially valid buffer.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SERIALIZED_HEADER_SIZE {
            return Err(Error::CorruptData(format!(
                "{} bytes is shorter than the {}-byte header",
                bytes.len(),
                SERIALIZED_HEADER_SIZE
            )));
        }

        let width = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let boundary = Boundary::from_u8(bytes[8])
            .ok_or_else(|| Error::CorruptData(format!("unknown boundary tag {}", bytes[8])))?;

        if width == 0 || height == 0 {
            return Err(Error::CorruptData(format!(
                "declared dimensions {}x{} are empty",
                width, height
            )));
        }

        let expected = Self::payload_len(width, height);
        let bits = &bytes[SERIALIZED_HEADER_SIZE..];
        if bits.len() as u64 != expected {
            return Err(Error::CorruptData(format!(
                "{}x{} grid needs {} payload bytes, found {}",
                width,
                height,
                expected,
                bits.len()
            )));
        }

        let total = width as usize * height as usize;
        let has_padding_bits = (total..bits.len() * 8).any(|i| bits[i / 8] & (1 << (i % 8)) != 0);
        if has_padding_bits {
            return Err(Error::CorruptData("padding bits are set".to_string()));
        }

        let mut grid = Self::new(width, height, boundary)?;
        let w = width as usize;
        for (byte_index, &byte) in bits.iter().enumerate() {
            for bit in SetBits(byte as u64) {
                let i = byte_index * 8 + bit;
                grid.put(i % w, i / w, true);
            }
        }
        Ok(grid)
    }

    /// Plaintext rendering, `O` for live and `.` for dead, one line per row.
    pub fn to_plaintext(&self) -> String {
        let mut out = String::with_capacity((self.width as usize + 1) * self.height as usize);
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                out.push(if self.bit(x, y) { 'O' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("boundary", &self.boundary)
            .field("population", &self.population())
            .finish()
    }
}

/// Iterator over the indices of set bits, lowest first.
struct SetBits(u64);

impl Iterator for SetBits {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

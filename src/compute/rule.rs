//! Outer-totalistic birth/survival rules.
//!
//! A rule maps a cell's current state and its live Moore-neighbor count
//! (0-8) to the next state. Rules are written in `B/S` notation, e.g.
//! `B3/S23` for Conway's Life.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Largest neighbor count in a Moore neighborhood.
pub const MAX_NEIGHBORS: u8 = 8;

/// Birth/survival rule stored as two 9-bit masks.
///
/// Bit `n` of `birth` is set when a dead cell with `n` live neighbors is born,
/// bit `n` of `survival` when a live cell with `n` live neighbors survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rule {
    birth: u16,
    survival: u16,
}

impl Default for Rule {
    fn default() -> Self {
        Self::conway()
    }
}

impl Rule {
    /// Build a rule from neighbor-count sets. Counts above 8 are rejected.
    pub fn new(birth: &[u8], survival: &[u8]) -> Result<Self, RuleError> {
        Ok(Self {
            birth: mask_from_counts(birth)?,
            survival: mask_from_counts(survival)?,
        })
    }

    /// Conway's Life, B3/S23.
    pub const fn conway() -> Self {
        Self {
            birth: 1 << 3,
            survival: (1 << 2) | (1 << 3),
        }
    }

    /// HighLife, B36/S23.
    pub const fn highlife() -> Self {
        Self {
            birth: (1 << 3) | (1 << 6),
            survival: (1 << 2) | (1 << 3),
        }
    }

    /// Seeds, B2/S.
    pub const fn seeds() -> Self {
        Self {
            birth: 1 << 2,
            survival: 0,
        }
    }

    /// Day & Night, B3678/S34678.
    pub const fn day_and_night() -> Self {
        Self {
            birth: (1 << 3) | (1 << 6) | (1 << 7) | (1 << 8),
            survival: (1 << 3) | (1 << 4) | (1 << 6) | (1 << 7) | (1 << 8),
        }
    }

    /// Life without Death, B3/S012345678.
    pub const fn life_without_death() -> Self {
        Self {
            birth: 1 << 3,
            survival: 0x1FF,
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "conway" | "life" => Some(Self::conway()),
            "highlife" => Some(Self::highlife()),
            "seeds" => Some(Self::seeds()),
            "day_and_night" | "daynight" => Some(Self::day_and_night()),
            "life_without_death" => Some(Self::life_without_death()),
            _ => None,
        }
    }

    /// Parse `B/S` notation (`B3/S23`, `S23/B3`) or the bare `23/3` survival/birth form.
    pub fn parse(notation: &str) -> Result<Self, RuleError> {
        let notation = notation.trim();
        let (left, right) = notation
            .split_once('/')
            .ok_or_else(|| RuleError::MissingSeparator(notation.to_string()))?;

        let mut birth = None;
        let mut survival = None;

        for section in [left, right] {
            let mut chars = section.chars();
            match chars.next() {
                Some('B' | 'b') => birth = Some(parse_digits(chars.as_str())?),
                Some('S' | 's') => survival = Some(parse_digits(chars.as_str())?),
                _ => {}
            }
        }

        match (birth, survival) {
            (Some(birth), Some(survival)) => Ok(Self { birth, survival }),
            (None, None) => Ok(Self {
                survival: parse_digits(left)?,
                birth: parse_digits(right)?,
            }),
            _ => Err(RuleError::MissingSection(notation.to_string())),
        }
    }

    /// Next state of a cell. Counts above 8 never match.
    #[inline]
    pub fn apply(&self, alive: bool, live_neighbors: u8) -> bool {
        let mask = if alive { self.survival } else { self.birth };
        live_neighbors <= MAX_NEIGHBORS && mask & (1 << live_neighbors) != 0
    }

    /// Raw birth mask (bit `n` = born with `n` neighbors).
    pub fn birth_mask(&self) -> u16 {
        self.birth
    }

    /// Raw survival mask (bit `n` = survives with `n` neighbors).
    pub fn survival_mask(&self) -> u16 {
        self.survival
    }

    /// Rebuild a rule from raw masks, rejecting bits above 8.
    pub fn from_masks(birth: u16, survival: u16) -> Result<Self, RuleError> {
        if birth > 0x1FF || survival > 0x1FF {
            return Err(RuleError::InvalidMask { birth, survival });
        }
        Ok(Self { birth, survival })
    }

    /// Neighbor counts that cause birth, ascending.
    pub fn birth_counts(&self) -> Vec<u8> {
        counts_from_mask(self.birth)
    }

    /// Neighbor counts that keep a live cell alive, ascending.
    pub fn survival_counts(&self) -> Vec<u8> {
        counts_from_mask(self.survival)
    }
}

fn mask_from_counts(counts: &[u8]) -> Result<u16, RuleError> {
    counts.iter().try_fold(0u16, |mask, &n| {
        if n > MAX_NEIGHBORS {
            Err(RuleError::CountOutOfRange(n))
        } else {
            Ok(mask | (1 << n))
        }
    })
}

fn counts_from_mask(mask: u16) -> Vec<u8> {
    (0..=MAX_NEIGHBORS).filter(|n| mask & (1 << n) != 0).collect()
}

fn parse_digits(digits: &str) -> Result<u16, RuleError> {
    digits.chars().try_fold(0u16, |mask, c| match c.to_digit(10) {
        Some(n) if n <= MAX_NEIGHBORS as u32 => Ok(mask | (1 << n)),
        Some(n) => Err(RuleError::CountOutOfRange(n as u8)),
        None => Err(RuleError::UnexpectedChar(c)),
    })
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B")?;
        for n in self.birth_counts() {
            write!(f, "{}", n)?;
        }
        write!(f, "/S")?;
        for n in self.survival_counts() {
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

impl FromStr for Rule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::preset(s).map_or_else(|| Self::parse(s), Ok)
    }
}

impl TryFrom<String> for Rule {
    type Error = RuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rule> for String {
    fn from(rule: Rule) -> Self {
        rule.to_string()
    }
}

/// Rule parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Rule '{0}' has no '/' between birth and survival")]
    MissingSeparator(String),
    #[error("Rule '{0}' must name both a B and an S section")]
    MissingSection(String),
    #[error("Neighbor count {0} exceeds 8")]
    CountOutOfRange(u8),
    #[error("Unexpected character '{0}' in rule")]
    UnexpectedChar(char),
    #[error("Rule masks out of range (birth {birth:#x}, survival {survival:#x})")]
    InvalidMask { birth: u16, survival: u16 },
}

//! Snapshot persistence for simulations.
//!
//! A snapshot stores one generation of a grid together with the rule and
//! generation counter needed to resume it.
//!
//! # File Format
//!
//! ```text
//! Header (28 bytes, little-endian):
//!   Magic: "LIFE" (4 bytes)
//!   Version: u16
//!   Flags: u16 (compression in the lower 4 bits)
//!   Generation: u64
//!   Birth mask: u16
//!   Survival mask: u16
//!   Payload length: u64
//!
//! Payload (payload length bytes):
//!   Grid::serialize() output, optionally LZ4 compressed
//! ```

mod format;

pub use format::{
    CompressionType, SNAPSHOT_MAGIC, SNAPSHOT_VERSION, SnapshotFlags, SnapshotHeader,
};

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};

use crate::compute::{Grid, Rule, Simulation};
use crate::error::{Error, Result};

use format::{compress_lz4, decompress_lz4};

/// Largest payload accepted when reading, to reject absurd length fields.
const MAX_PAYLOAD_LEN: u64 = 1 << 34;

/// A saved generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub generation: u64,
    pub rule: Rule,
    pub grid: Grid,
}

impl Snapshot {
    pub fn new(grid: Grid, rule: Rule, generation: u64) -> Self {
        Self {
            generation,
            rule,
            grid,
        }
    }

    /// Capture the current generation of a simulation.
    pub fn from_simulation(sim: &Simulation) -> Self {
        Self::new(sim.grid().clone(), *sim.rule(), sim.generation())
    }

    /// Write header and payload.
    ///
    /// LZ4 falls back to an uncompressed payload when the `lz4` feature is off.
    pub fn write_to<W: Write>(&self, w: &mut W, compression: CompressionType) -> Result<()> {
        let compression = compression.effective();
        let raw = self.grid.serialize();
        let payload = match compression {
            CompressionType::None => raw,
            CompressionType::Lz4 => compress_lz4(&raw),
        };

        let header = SnapshotHeader {
            flags: SnapshotFlags { compression },
            generation: self.generation,
            birth: self.rule.birth_mask(),
            survival: self.rule.survival_mask(),
            payload_len: payload.len() as u64,
        };
        header.write_to(w)?;
        w.write_all(&payload)?;
        Ok(())
    }

    /// Read a snapshot written by [`Snapshot::write_to`].
    ///
    /// Malformed headers, rules or grid payloads are reported as
    /// [`Error::CorruptData`].
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let header = SnapshotHeader::read_from(r).map_err(corrupt)?;
        let rule = Rule::from_masks(header.birth, header.survival)
            .map_err(|e| Error::CorruptData(e.to_string()))?;

        if header.payload_len > MAX_PAYLOAD_LEN {
            return Err(Error::CorruptData(format!(
                "payload length {} exceeds limit",
                header.payload_len
            )));
        }

        let mut payload = Vec::new();
        r.by_ref()
            .take(header.payload_len)
            .read_to_end(&mut payload)?;
        if payload.len() as u64 != header.payload_len {
            return Err(Error::CorruptData(format!(
                "payload truncated: expected {} bytes, found {}",
                header.payload_len,
                payload.len()
            )));
        }

        let raw = match header.flags.compression {
            CompressionType::None => payload,
            CompressionType::Lz4 => decompress_lz4(&payload).map_err(corrupt)?,
        };

        Ok(Self {
            generation: header.generation,
            rule,
            grid: Grid::deserialize(&raw)?,
        })
    }

    /// Resume a simulation from this snapshot.
    pub fn into_simulation(self) -> Simulation {
        let mut sim = Simulation::new(self.grid, self.rule);
        sim.set_generation(self.generation);
        sim
    }
}

/// Format errors become `CorruptData`; everything else stays an I/O error.
fn corrupt(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            Error::CorruptData(e.to_string())
        }
        _ => Error::Io(e),
    }
}

/// Save a snapshot to `path`.
pub fn save_snapshot<P: AsRef<Path>>(
    path: P,
    snapshot: &Snapshot,
    compression: CompressionType,
) -> Result<()> {
    let path = path.as_ref();
    let mut w = BufWriter::new(File::create(path)?);
    snapshot.write_to(&mut w, compression)?;
    w.flush()?;

    info!(
        "Saved generation {} ({}x{}) to {}",
        snapshot.generation,
        snapshot.grid.width(),
        snapshot.grid.height(),
        path.display()
    );
    Ok(())
}

/// Load a snapshot from `path`.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let path = path.as_ref();
    let mut r = BufReader::new(File::open(path)?);
    let snapshot = Snapshot::read_from(&mut r)?;

    debug!(
        "Loaded generation {} ({}x{}, {}) from {}",
        snapshot.generation,
        snapshot.grid.width(),
        snapshot.grid.height(),
        snapshot.rule,
        path.display()
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Boundary;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn snapshot() -> Snapshot {
        let mut grid = Grid::new(70, 33, Boundary::Fixed).unwrap();
        grid.randomize(0.3, 99);
        Snapshot::new(grid, Rule::highlife(), 42)
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("soup.life");

        save_snapshot(&path, &snapshot(), CompressionType::None).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot());

        let len = std::fs::metadata(&path).unwrap().len() as usize;
        assert_eq!(
            len,
            SnapshotHeader::SIZE + snapshot().grid.serialize().len()
        );
    }

    #[test]
    fn test_compressed_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("soup-lz4.life");

        // Without the lz4 feature this silently writes an uncompressed payload.
        save_snapshot(&path, &snapshot(), CompressionType::Lz4).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), snapshot());
    }

    #[test]
    fn test_resume_simulation() {
        let mut sim = snapshot().into_simulation();
        assert_eq!(sim.generation(), 42);
        assert_eq!(sim.rule(), &Rule::highlife());

        sim.step();
        let resaved = Snapshot::from_simulation(&sim);
        assert_eq!(resaved.generation, 43);
    }

    #[test]
    fn test_truncated_payload() {
        let mut buf = Vec::new();
        snapshot().write_to(&mut buf, CompressionType::None).unwrap();
        buf.truncate(buf.len() - 3);

        assert!(matches!(
            Snapshot::read_from(&mut Cursor::new(&buf)),
            Err(Error::CorruptData(_))
        ));
    }

    #[test]
    fn test_corrupt_rule_and_header() {
        let mut buf = Vec::new();
        snapshot().write_to(&mut buf, CompressionType::None).unwrap();

        let mut bad_rule = buf.clone();
        bad_rule[16..18].copy_from_slice(&0xFFFFu16.to_le_bytes());
        assert!(matches!(
            Snapshot::read_from(&mut Cursor::new(&bad_rule)),
            Err(Error::CorruptData(_))
        ));

        assert!(matches!(
            Snapshot::read_from(&mut Cursor::new(&buf[..10])),
            Err(Error::CorruptData(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_snapshot(dir.path().join("missing.life")),
            Err(Error::Io(_))
        ));
    }
}

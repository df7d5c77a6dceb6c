//! Binary format definitions for grid snapshot files.

use std::io::{self, Read, Write};

/// Magic bytes identifying a snapshot file.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"LIFE";

/// Current format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Compression applied to the grid payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CompressionType {
    /// Raw `Grid::serialize` bytes.
    #[default]
    None = 0,
    /// LZ4 block with the uncompressed size prepended.
    Lz4 = 1,
}

impl CompressionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Lz4),
            _ => None,
        }
    }

    /// Compression actually used when writing with this build.
    pub fn effective(self) -> Self {
        if cfg!(feature = "lz4") {
            self
        } else {
            CompressionType::None
        }
    }
}

/// Snapshot header flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotFlags {
    /// Compression type (lower 4 bits).
    pub compression: CompressionType,
}

impl SnapshotFlags {
    pub fn to_u16(self) -> u16 {
        self.compression as u16
    }

    /// Decode flags, `None` for an unknown compression type or reserved bits.
    pub fn from_u16(v: u16) -> Option<Self> {
        if v & !0x0F != 0 {
            return None;
        }
        Some(Self {
            compression: CompressionType::from_u8((v & 0x0F) as u8)?,
        })
    }
}

/// File header for snapshot files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub flags: SnapshotFlags,
    /// Generation counter at the time of saving.
    pub generation: u64,
    /// Rule birth mask.
    pub birth: u16,
    /// Rule survival mask.
    pub survival: u16,
    /// Bytes of (possibly compressed) grid payload following the header.
    pub payload_len: u64,
}

impl SnapshotHeader {
    /// Size of header in bytes.
    /// Magic(4) + Version(2) + Flags(2) + Generation(8) + Birth(2) +
    /// Survival(2) + PayloadLen(8) = 28
    pub const SIZE: usize = 28;

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(SNAPSHOT_MAGIC)?;
        w.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
        w.write_all(&self.flags.to_u16().to_le_bytes())?;
        w.write_all(&self.generation.to_le_bytes())?;
        w.write_all(&self.birth.to_le_bytes())?;
        w.write_all(&self.survival.to_le_bytes())?;
        w.write_all(&self.payload_len.to_le_bytes())?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid LIFE magic bytes",
            ));
        }

        let mut buf2 = [0u8; 2];
        let mut buf8 = [0u8; 8];

        r.read_exact(&mut buf2)?;
        let version = u16::from_le_bytes(buf2);
        if version != SNAPSHOT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported snapshot version: {}", version),
            ));
        }

        r.read_exact(&mut buf2)?;
        let raw_flags = u16::from_le_bytes(buf2);
        let flags = SnapshotFlags::from_u16(raw_flags).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown snapshot flags: {:#06x}", raw_flags),
            )
        })?;

        r.read_exact(&mut buf8)?;
        let generation = u64::from_le_bytes(buf8);

        r.read_exact(&mut buf2)?;
        let birth = u16::from_le_bytes(buf2);

        r.read_exact(&mut buf2)?;
        let survival = u16::from_le_bytes(buf2);

        r.read_exact(&mut buf8)?;
        let payload_len = u64::from_le_bytes(buf8);

        Ok(Self {
            flags,
            generation,
            birth,
            survival,
            payload_len,
        })
    }
}

/// Compress data using LZ4.
#[cfg(feature = "lz4")]
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress LZ4 data.
#[cfg(feature = "lz4")]
pub fn decompress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Fallback when LZ4 is not available.
#[cfg(not(feature = "lz4"))]
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

#[cfg(not(feature = "lz4"))]
pub fn decompress_lz4(_data: &[u8]) -> io::Result<Vec<u8>> {
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "Snapshot is LZ4 compressed but lz4 support is not enabled",
    ))
}

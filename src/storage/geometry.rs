use crate::common::{Result, SpindleError};

/// Physical shape of the simulated disk.
///
/// Persisted once at the start of sector 0 when the disk is created and
/// read-only from then on. Every plate has two surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    /// Number of plates.
    pub plates: i32,
    /// Tracks per surface.
    pub tracks: i32,
    /// Sectors per track.
    pub sectors: i32,
    /// Bytes per sector.
    pub bytes: i32,
    /// Sectors per page ("block").
    pub block_size: i32,
}

impl DiskGeometry {
    /// Encoded length of the geometry header on disk: five `i32` fields.
    pub const ENCODED_LEN: usize = 20;

    /// Checks the bounds enforced at disk creation.
    pub fn validate(&self) -> Result<()> {
        let reject = |what: &str| Err(SpindleError::InvalidGeometry(what.to_string()));
        if self.plates < 1 {
            return reject("plates must be at least 1");
        }
        if self.tracks < 1 {
            return reject("tracks must be at least 1");
        }
        if self.sectors < 1 {
            return reject("sectors must be at least 1");
        }
        if self.bytes < 16 {
            return reject("bytes per sector must be at least 16");
        }
        if self.block_size < 1 {
            return reject("block size must be at least 1");
        }
        Ok(())
    }

    /// Total sector count: plates × 2 surfaces × tracks × sectors.
    pub fn total_sectors(&self) -> i32 {
        self.plates * 2 * self.tracks * self.sectors
    }

    /// Number of whole pages on the disk.
    pub fn total_pages(&self) -> i32 {
        self.total_sectors() / self.block_size
    }

    /// Total capacity in bytes.
    pub fn total_bytes(&self) -> i64 {
        self.total_sectors() as i64 * self.bytes as i64
    }

    pub fn sector_bytes(&self) -> usize {
        self.bytes as usize
    }

    /// Size of one page in bytes: `block_size` contiguous sectors.
    pub fn page_bytes(&self) -> usize {
        (self.bytes * self.block_size) as usize
    }

    /// Serializes the geometry to its on-disk form (little-endian).
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut bytes = [0u8; Self::ENCODED_LEN];
        for (slot, field) in [
            self.plates,
            self.tracks,
            self.sectors,
            self.bytes,
            self.block_size,
        ]
        .iter()
        .enumerate()
        {
            bytes[slot * 4..slot * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        bytes
    }

    /// Deserializes a geometry from the start of a sector image.
    /// Returns None if `data` is too short.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < Self::ENCODED_LEN {
            return None;
        }
        let field = |slot: usize| {
            let bytes: [u8; 4] = data[slot * 4..slot * 4 + 4].try_into().unwrap();
            i32::from_le_bytes(bytes)
        };
        Some(Self {
            plates: field(0),
            tracks: field(1),
            sectors: field(2),
            bytes: field(3),
            block_size: field(4),
        })
    }
}

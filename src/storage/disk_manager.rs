use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::common::{Result, SectorAddress, SpindleError};

use super::DiskGeometry;

/// DiskManager materializes the simulated disk as a directory tree of
/// fixed-size sector files and performs whole-sector reads and writes.
///
/// The tree is `p{plate}/f{surface}/t{track}/s{sector}` under the disk root,
/// one file of exactly `geometry.bytes` octets per sector. Above the
/// geometry bootstrap in [`DiskManager::open`], every sector access goes
/// through the buffer pool.
pub struct DiskManager {
    root: PathBuf,
    geometry: DiskGeometry,
}

impl DiskManager {
    /// Creates the directory tree with a zero-filled file per sector, then
    /// persists the geometry at the start of sector 0.
    pub fn create(root: impl AsRef<Path>, geometry: DiskGeometry) -> Result<Self> {
        geometry.validate()?;
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let zeros = vec![0u8; geometry.sector_bytes()];
        for plate in 0..geometry.plates {
            for surface in 0..2 {
                for track in 0..geometry.tracks {
                    let track_dir = root
                        .join(format!("p{plate}"))
                        .join(format!("f{surface}"))
                        .join(format!("t{track}"));
                    fs::create_dir_all(&track_dir)?;
                    for sector in 0..geometry.sectors {
                        fs::write(track_dir.join(format!("s{sector}")), &zeros)?;
                    }
                }
            }
        }

        let dm = Self { root, geometry };

        // Sector 0 starts with the geometry header; the rest stays zeroed.
        let mut first = zeros;
        first[..DiskGeometry::ENCODED_LEN].copy_from_slice(&geometry.encode());
        dm.write_sector(SectorAddress(0), &first)?;

        info!(
            sectors = geometry.total_sectors(),
            bytes = geometry.total_bytes(),
            "disk created at {}",
            dm.root.display()
        );
        Ok(dm)
    }

    /// Opens an existing disk, reading the geometry back from sector 0.
    /// This is the only sector access that bypasses the buffer pool.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(SpindleError::DiskNotFound(root));
        }

        let first = root.join("p0").join("f0").join("t0").join("s0");
        let mut header = [0u8; DiskGeometry::ENCODED_LEN];
        File::open(&first)
            .map_err(|_| SpindleError::DiskNotFound(root.clone()))?
            .read_exact(&mut header)?;
        let geometry = DiskGeometry::decode(&header)
            .ok_or_else(|| SpindleError::InvalidGeometry("truncated geometry header".into()))?;
        geometry.validate()?;

        Ok(Self { root, geometry })
    }

    pub fn geometry(&self) -> &DiskGeometry {
        &self.geometry
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps an address to its sector file.
    ///
    /// Decode order is plate, then sector, then track, then surface, so
    /// consecutive addresses walk a cylinder before the head moves.
    pub fn sector_path(&self, addr: SectorAddress) -> PathBuf {
        let mut a = addr.as_i32();
        let plate = a % self.geometry.plates;
        a /= self.geometry.plates;
        let sector = a % self.geometry.sectors;
        a /= self.geometry.sectors;
        let track = a % self.geometry.tracks;
        a /= self.geometry.tracks;
        let surface = a % 2;

        self.root
            .join(format!("p{plate}"))
            .join(format!("f{surface}"))
            .join(format!("t{track}"))
            .join(format!("s{sector}"))
    }

    /// Reads one sector into `buf` (must be `geometry.bytes` long).
    /// Short files are zero-padded.
    pub fn read_sector(&self, addr: SectorAddress, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.geometry.sector_bytes());
        let mut file = File::open(self.sector_path(addr))?;
        let mut filled = 0;
        loop {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf[filled..].fill(0);
        Ok(())
    }

    /// Writes one full sector from `data` (must be `geometry.bytes` long).
    pub fn write_sector(&self, addr: SectorAddress, data: &[u8]) -> Result<()> {
        debug_assert_eq!(data.len(), self.geometry.sector_bytes());
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.sector_path(addr))?;
        file.write_all(data)?;
        debug!(address = addr.as_i32(), "sector written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> DiskGeometry {
        DiskGeometry {
            plates: 2,
            tracks: 2,
            sectors: 4,
            bytes: 64,
            block_size: 2,
        }
    }

    #[test]
    fn test_create_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("disk");

        let dm = DiskManager::create(&root, geometry()).unwrap();
        assert_eq!(*dm.geometry(), geometry());

        let reopened = DiskManager::open(&root).unwrap();
        assert_eq!(*reopened.geometry(), geometry());
    }

    #[test]
    fn test_create_rejects_invalid_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let bad = DiskGeometry { bytes: 8, ..geometry() };
        assert!(matches!(
            DiskManager::create(dir.path().join("disk"), bad),
            Err(SpindleError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_open_missing_disk() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DiskManager::open(dir.path().join("disk")),
            Err(SpindleError::DiskNotFound(_))
        ));
    }

    #[test]
    fn test_sector_files_have_exact_size() {
        let dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("disk"), geometry()).unwrap();

        for raw in 0..geometry().total_sectors() {
            let path = dm.sector_path(SectorAddress(raw));
            let len = fs::metadata(&path).unwrap().len();
            assert_eq!(len, geometry().bytes as u64, "sector {raw}");
        }
    }

    #[test]
    fn test_address_decode_order() {
        let dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("disk"), geometry()).unwrap();
        let root = dm.root().to_path_buf();

        // plate varies fastest, then sector, then track, then surface
        assert_eq!(
            dm.sector_path(SectorAddress(0)),
            root.join("p0").join("f0").join("t0").join("s0")
        );
        assert_eq!(
            dm.sector_path(SectorAddress(1)),
            root.join("p1").join("f0").join("t0").join("s0")
        );
        assert_eq!(
            dm.sector_path(SectorAddress(2)),
            root.join("p0").join("f0").join("t0").join("s1")
        );
        assert_eq!(
            dm.sector_path(SectorAddress(8)),
            root.join("p0").join("f0").join("t1").join("s0")
        );
        assert_eq!(
            dm.sector_path(SectorAddress(16)),
            root.join("p0").join("f1").join("t0").join("s0")
        );
    }

    #[test]
    fn test_sector_read_write_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("disk"), geometry()).unwrap();

        let addr = SectorAddress(5);
        let mut data = vec![0u8; geometry().sector_bytes()];
        data[0] = 42;
        data[63] = 7;
        dm.write_sector(addr, &data).unwrap();

        let mut read_back = vec![0u8; geometry().sector_bytes()];
        dm.read_sector(addr, &mut read_back).unwrap();
        assert_eq!(read_back, data);
    }

    #[test]
    fn test_geometry_survives_in_sector_zero() {
        let dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("disk"), geometry()).unwrap();

        let mut first = vec![0u8; geometry().sector_bytes()];
        dm.read_sector(SectorAddress(0), &mut first).unwrap();
        assert_eq!(DiskGeometry::decode(&first), Some(geometry()));
    }
}

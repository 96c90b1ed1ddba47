//! The table catalog: an array of `{name, header_address}` entries packed
//! into sector 0 right after the geometry header. The first entry whose
//! name byte is NUL terminates the list; entries below it are all in use.

use crate::buffer::BufferPool;
use crate::common::{Result, SectorAddress, SpindleError, NAME_LEN};
use crate::record::FixedName;
use crate::storage::DiskGeometry;

/// Sector holding the geometry header and the catalog.
pub const CATALOG_SECTOR: SectorAddress = SectorAddress(0);

/// One catalog slot: a name slot plus a header address.
pub const ENTRY_LEN: usize = NAME_LEN + 4;

/// Looks a table up by name. Returns its header sector, or None.
pub fn search_table(pool: &BufferPool, name: &str) -> Result<Option<SectorAddress>> {
    let target = FixedName::from_str(name);
    pool.with_sector(CATALOG_SECTOR, |sector| {
        let mut offset = DiskGeometry::ENCODED_LEN;
        while offset + ENTRY_LEN <= sector.len() {
            let entry = FixedName::from_bytes(&sector[offset..]);
            if entry.is_empty() {
                return None;
            }
            if entry == target {
                return Some(SectorAddress::read_from(&sector[offset + NAME_LEN..]));
            }
            offset += ENTRY_LEN;
        }
        None
    })
}

/// Claims the first unused catalog slot for `name`, pointing it at `header`.
pub fn register_table(pool: &BufferPool, name: &str, header: SectorAddress) -> Result<()> {
    let entry = FixedName::from_str(name);
    pool.with_sector_mut(CATALOG_SECTOR, |sector| {
        let mut offset = DiskGeometry::ENCODED_LEN;
        while offset + ENTRY_LEN <= sector.len() {
            if sector[offset] == 0 {
                sector[offset..offset + NAME_LEN].copy_from_slice(entry.as_bytes());
                header.write_to(&mut sector[offset + NAME_LEN..]);
                return Ok(());
            }
            offset += ENTRY_LEN;
        }
        Err(SpindleError::CatalogFull)
    })?
}

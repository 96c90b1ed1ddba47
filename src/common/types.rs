use std::fmt;

/// Address of a single sector on the simulated disk.
///
/// The integer packs plate, sector, track and surface with the plate varying
/// fastest, so consecutive addresses fill a cylinder before the head has to
/// seek. `SectorAddress::NULL` marks the end of a sector chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorAddress(pub i32);

impl SectorAddress {
    /// The reserved null address terminating every chain.
    pub const NULL: SectorAddress = SectorAddress(-1);

    pub fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == Self::NULL.0
    }

    /// The page (block) this sector belongs to.
    pub fn page(&self, block_size: i32) -> PageId {
        PageId(self.0 / block_size)
    }

    /// Offset of this sector within its page, in sectors.
    pub fn slot_in_page(&self, block_size: i32) -> usize {
        (self.0 % block_size) as usize
    }

    /// Reads an address from the first four bytes of `data` (little-endian).
    pub fn read_from(data: &[u8]) -> Self {
        let bytes: [u8; 4] = data[..4].try_into().unwrap();
        Self(i32::from_le_bytes(bytes))
    }

    /// Writes the address into the first four bytes of `data` (little-endian).
    pub fn write_to(&self, data: &mut [u8]) {
        data[..4].copy_from_slice(&self.0.to_le_bytes());
    }
}

impl fmt::Display for SectorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Sector(null)")
        } else {
            write!(f, "Sector({})", self.0)
        }
    }
}

/// Page identifier: the index of a `block_size`-sector group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub i32);

impl PageId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Address of the first sector of this page.
    pub fn first_sector(&self, block_size: i32) -> SectorAddress {
        SectorAddress(self.0 * block_size)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_address() {
        assert!(SectorAddress::NULL.is_null());
        assert!(!SectorAddress(0).is_null());
        assert_eq!(SectorAddress::NULL.as_i32(), -1);
    }

    #[test]
    fn test_page_mapping() {
        let addr = SectorAddress(9);
        assert_eq!(addr.page(4), PageId(2));
        assert_eq!(addr.slot_in_page(4), 1);
        assert_eq!(PageId(2).first_sector(4), SectorAddress(8));
    }

    #[test]
    fn test_address_codec() {
        let mut buf = [0u8; 8];
        SectorAddress::NULL.write_to(&mut buf);
        assert_eq!(SectorAddress::read_from(&buf), SectorAddress::NULL);
        SectorAddress(513).write_to(&mut buf);
        assert_eq!(SectorAddress::read_from(&buf), SectorAddress(513));
    }
}

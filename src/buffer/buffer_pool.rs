use std::collections::{HashMap, VecDeque};
use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::common::{PageId, Result, SectorAddress, SpindleError};
use crate::storage::{DiskGeometry, DiskManager};

use super::Frame;

/// How a sector is being accessed. Write access marks the frame dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

struct PoolState {
    frames: HashMap<PageId, Frame>,
    /// Eviction order: front is the LRU end, back is the MRU end.
    lru: VecDeque<PageId>,
    total_accesses: u64,
    hits: u64,
}

/// BufferPool caches pages (groups of `block_size` sectors) over the sector
/// files and mediates every sector access above the geometry bootstrap.
///
/// At most `capacity` pages are resident. A miss on a full pool evicts the
/// least recently used frame with a zero pin count, writing it back first
/// when dirty; pinned frames are skipped without losing their position in
/// the eviction order. When every frame is pinned the access fails with
/// [`SpindleError::AllPinned`].
///
/// Sector content is exposed through closure-scoped access
/// ([`BufferPool::with_sector`] / [`BufferPool::with_sector_mut`]): the
/// borrow ends before the pool can evict again, so callers can never hold a
/// slice into a recycled frame. A caller that needs a page to stay resident
/// across accesses takes a [`PinGuard`].
pub struct BufferPool {
    disk: DiskManager,
    capacity: usize,
    state: Mutex<PoolState>,
}

impl BufferPool {
    pub fn new(disk: DiskManager, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool needs at least one frame");
        Self {
            disk,
            capacity,
            state: Mutex::new(PoolState {
                frames: HashMap::with_capacity(capacity),
                lru: VecDeque::with_capacity(capacity),
                total_accesses: 0,
                hits: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn geometry(&self) -> &DiskGeometry {
        self.disk.geometry()
    }

    pub fn disk(&self) -> &DiskManager {
        &self.disk
    }

    /// Runs `f` over the sector's bytes in read mode.
    pub fn with_sector<R>(&self, addr: SectorAddress, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let mut state = self.state.lock();
        let page = addr.page(self.geometry().block_size);
        self.fetch(&mut state, page)?;
        let frame = &state.frames[&page];
        Ok(f(self.sector_slice(frame.data(), addr)))
    }

    /// Runs `f` over the sector's bytes in write mode, marking the enclosing
    /// frame dirty.
    pub fn with_sector_mut<R>(
        &self,
        addr: SectorAddress,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R> {
        let mut state = self.state.lock();
        let page = addr.page(self.geometry().block_size);
        self.fetch(&mut state, page)?;
        let range = self.sector_range(addr);
        match state.frames.get_mut(&page) {
            Some(frame) => {
                frame.mark_dirty();
                Ok(f(&mut frame.data_mut()[range]))
            }
            None => unreachable!("page resident after fetch"),
        }
    }

    /// Touches the first sector of a page in the requested mode.
    pub fn access(&self, addr: SectorAddress, mode: AccessMode) -> Result<()> {
        match mode {
            AccessMode::Read => self.with_sector(addr, |_| ()),
            AccessMode::Write => self.with_sector_mut(addr, |_| ()),
        }
    }

    /// Pins the page holding `addr`. A no-op when the page is not resident;
    /// use [`BufferPool::pin_guard`] to fetch and pin in one step.
    pub fn pin(&self, addr: SectorAddress) {
        let mut state = self.state.lock();
        let page = addr.page(self.geometry().block_size);
        if let Some(frame) = state.frames.get_mut(&page) {
            frame.pin();
        }
    }

    /// Unpins the page holding `addr`, saturating at zero. A no-op when the
    /// page is not resident.
    pub fn unpin(&self, addr: SectorAddress) {
        let mut state = self.state.lock();
        let page = addr.page(self.geometry().block_size);
        if let Some(frame) = state.frames.get_mut(&page) {
            frame.unpin();
        }
    }

    /// Fetches the page holding `addr` and pins it, returning a guard that
    /// unpins on drop.
    pub fn pin_guard(&self, addr: SectorAddress) -> Result<PinGuard<'_>> {
        {
            let mut state = self.state.lock();
            let page = addr.page(self.geometry().block_size);
            self.fetch(&mut state, page)?;
            match state.frames.get_mut(&page) {
                Some(frame) => frame.pin(),
                None => unreachable!("page resident after fetch"),
            }
        }
        Ok(PinGuard { pool: self, addr })
    }

    /// Writes every dirty frame back to its sector files.
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        let pages: Vec<PageId> = state.frames.keys().copied().collect();
        for page in pages {
            if let Some(frame) = state.frames.get(&page) {
                if !frame.is_dirty() {
                    continue;
                }
                self.write_back(page, frame.data())?;
            }
            if let Some(frame) = state.frames.get_mut(&page) {
                frame.clear_dirty();
            }
        }
        Ok(())
    }

    /// Snapshot of the pool for diagnostics (`BUFFER`).
    pub fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        let frames = state
            .lru
            .iter()
            .rev()
            .enumerate()
            .map(|(position, page)| {
                let frame = &state.frames[page];
                FrameStatus {
                    page: *page,
                    dirty: frame.is_dirty(),
                    pin_count: frame.pin_count(),
                    position,
                }
            })
            .collect();
        PoolStatus {
            frames,
            total_accesses: state.total_accesses,
            hits: state.hits,
        }
    }

    /// Makes `page` resident, counting the access.
    fn fetch(&self, state: &mut PoolState, page: PageId) -> Result<()> {
        state.total_accesses += 1;

        if state.frames.contains_key(&page) {
            state.hits += 1;
            if let Some(pos) = state.lru.iter().position(|p| *p == page) {
                state.lru.remove(pos);
            }
            state.lru.push_back(page);
            trace!(page = page.as_i32(), "page hit");
            return Ok(());
        }

        if state.frames.len() == self.capacity {
            self.evict_one(state)?;
        }

        let frame = Frame::new(self.load_page(page)?);
        state.frames.insert(page, frame);
        state.lru.push_back(page);
        debug!(page = page.as_i32(), "page loaded");
        Ok(())
    }

    /// Evicts the least recently used unpinned frame, flushing it if dirty.
    fn evict_one(&self, state: &mut PoolState) -> Result<()> {
        let victim = *state
            .lru
            .iter()
            .find(|page| state.frames[*page].pin_count() == 0)
            .ok_or(SpindleError::AllPinned)?;
        state.lru.retain(|page| *page != victim);

        if let Some(frame) = state.frames.remove(&victim) {
            if frame.is_dirty() {
                self.write_back(victim, frame.data())?;
            }
        }
        debug!(page = victim.as_i32(), "page evicted");
        Ok(())
    }

    /// Loads a page by concatenating its `block_size` sector files.
    fn load_page(&self, page: PageId) -> Result<Vec<u8>> {
        let g = self.geometry();
        let sector_bytes = g.sector_bytes();
        let mut data = vec![0u8; g.page_bytes()];
        for slot in 0..g.block_size {
            let addr = SectorAddress(page.as_i32() * g.block_size + slot);
            let start = slot as usize * sector_bytes;
            self.disk
                .read_sector(addr, &mut data[start..start + sector_bytes])?;
        }
        Ok(data)
    }

    /// Splits a page image back into `block_size` sector writes.
    fn write_back(&self, page: PageId, data: &[u8]) -> Result<()> {
        let g = self.geometry();
        let sector_bytes = g.sector_bytes();
        for slot in 0..g.block_size {
            let addr = SectorAddress(page.as_i32() * g.block_size + slot);
            let start = slot as usize * sector_bytes;
            self.disk
                .write_sector(addr, &data[start..start + sector_bytes])?;
        }
        Ok(())
    }

    fn sector_range(&self, addr: SectorAddress) -> std::ops::Range<usize> {
        let g = self.geometry();
        let start = addr.slot_in_page(g.block_size) * g.sector_bytes();
        start..start + g.sector_bytes()
    }

    fn sector_slice<'d>(&self, page_data: &'d [u8], addr: SectorAddress) -> &'d [u8] {
        &page_data[self.sector_range(addr)]
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        if let Err(err) = self.flush_all() {
            error!("failed to flush buffer pool at teardown: {err}");
        }
    }
}

/// Keeps a page resident: pinned on construction, unpinned on drop.
pub struct PinGuard<'a> {
    pool: &'a BufferPool,
    addr: SectorAddress,
}

impl PinGuard<'_> {
    pub fn address(&self) -> SectorAddress {
        self.addr
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin(self.addr);
    }
}

/// One resident frame in a [`PoolStatus`] snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FrameStatus {
    pub page: PageId,
    pub dirty: bool,
    pub pin_count: u32,
    /// Recency rank: 0 is the most recently used frame.
    pub position: usize,
}

/// Diagnostic snapshot of the buffer pool.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Resident frames, most recently used first.
    pub frames: Vec<FrameStatus>,
    pub total_accesses: u64,
    pub hits: u64,
}

impl PoolStatus {
    pub fn misses(&self) -> u64 {
        self.total_accesses - self.hits
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total_accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_accesses as f64
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID\tL/W\tDIRTY\tPINS\tMRU")?;
        for frame in &self.frames {
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}",
                frame.page.as_i32(),
                if frame.dirty { 'W' } else { 'L' },
                frame.dirty as u8,
                frame.pin_count,
                frame.position
            )?;
        }
        writeln!(
            f,
            "\nTotal accesses {}\tHits {}",
            self.total_accesses, self.hits
        )?;
        write!(f, "Hit rate {:.2}%", self.hit_rate() * 100.0)
    }
}

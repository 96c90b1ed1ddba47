use spindle::buffer::{AccessMode, BufferPool};
use spindle::storage::{DiskGeometry, DiskManager};
use spindle::{PageId, SectorAddress, SpindleError};

fn geometry() -> DiskGeometry {
    DiskGeometry {
        plates: 1,
        tracks: 2,
        sectors: 8,
        bytes: 64,
        block_size: 2,
    }
}

fn create_pool(capacity: usize) -> (BufferPool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskManager::create(dir.path().join("disk"), geometry()).unwrap();
    (BufferPool::new(disk, capacity), dir)
}

fn first_sector(page: i32) -> SectorAddress {
    PageId(page).first_sector(geometry().block_size)
}

fn resident_pages(pool: &BufferPool) -> Vec<i32> {
    let mut pages: Vec<i32> = pool
        .status()
        .frames
        .iter()
        .map(|f| f.page.as_i32())
        .collect();
    pages.sort();
    pages
}

#[test]
fn test_at_most_capacity_pages_resident() {
    let (pool, _dir) = create_pool(3);

    for page in 0..8 {
        pool.access(first_sector(page), AccessMode::Read).unwrap();
        assert!(pool.status().frames.len() <= 3);
    }
    assert_eq!(pool.status().frames.len(), 3);
}

#[test]
fn test_lru_page_is_the_victim() {
    let (pool, _dir) = create_pool(2);

    pool.access(first_sector(0), AccessMode::Read).unwrap();
    pool.access(first_sector(1), AccessMode::Read).unwrap();
    // touch page 0 so page 1 becomes the LRU
    pool.access(first_sector(0), AccessMode::Read).unwrap();

    pool.access(first_sector(2), AccessMode::Read).unwrap();
    assert_eq!(resident_pages(&pool), vec![0, 2]);
}

#[test]
fn test_reaccess_after_eviction_is_a_miss() {
    let (pool, _dir) = create_pool(2);

    pool.access(first_sector(0), AccessMode::Read).unwrap();
    pool.access(first_sector(1), AccessMode::Read).unwrap();
    pool.access(first_sector(2), AccessMode::Read).unwrap(); // evicts 0

    let before = pool.status();
    pool.access(first_sector(0), AccessMode::Read).unwrap();
    let after = pool.status();

    assert_eq!(after.hits, before.hits);
    assert_eq!(after.misses(), before.misses() + 1);
}

#[test]
fn test_hits_and_misses_sum_to_total() {
    let (pool, _dir) = create_pool(2);

    for page in [0, 1, 0, 0, 2, 1, 0] {
        pool.access(first_sector(page), AccessMode::Read).unwrap();
    }

    let status = pool.status();
    assert_eq!(status.total_accesses, 7);
    assert_eq!(status.hits + status.misses(), status.total_accesses);
    // sectors of one page hit too
    pool.access(SectorAddress(1), AccessMode::Read).unwrap();
    let status = pool.status();
    assert_eq!(status.total_accesses, 8);
}

#[test]
fn test_pinned_page_is_skipped_at_eviction() {
    let (pool, _dir) = create_pool(2);

    pool.access(first_sector(0), AccessMode::Read).unwrap();
    pool.pin(first_sector(0));
    pool.access(first_sector(1), AccessMode::Read).unwrap();

    // page 0 is the LRU but pinned; page 1 must go instead
    pool.access(first_sector(2), AccessMode::Read).unwrap();
    assert_eq!(resident_pages(&pool), vec![0, 2]);
}

#[test]
fn test_all_pinned_fails() {
    let (pool, _dir) = create_pool(2);

    let _guard0 = pool.pin_guard(first_sector(0)).unwrap();
    let _guard1 = pool.pin_guard(first_sector(1)).unwrap();

    assert!(matches!(
        pool.access(first_sector(2), AccessMode::Read),
        Err(SpindleError::AllPinned)
    ));
}

#[test]
fn test_pin_guard_unpins_on_drop() {
    let (pool, _dir) = create_pool(2);

    {
        let _guard0 = pool.pin_guard(first_sector(0)).unwrap();
        let _guard1 = pool.pin_guard(first_sector(1)).unwrap();
    }

    // guards dropped, eviction can proceed again
    pool.access(first_sector(2), AccessMode::Read).unwrap();
    assert_eq!(pool.status().frames.len(), 2);
}

#[test]
fn test_unpin_saturates_at_zero() {
    let (pool, _dir) = create_pool(2);

    pool.access(first_sector(0), AccessMode::Read).unwrap();
    pool.unpin(first_sector(0));
    pool.unpin(first_sector(0));
    assert_eq!(pool.status().frames[0].pin_count, 0);

    pool.pin(first_sector(0));
    assert_eq!(pool.status().frames[0].pin_count, 1);
}

#[test]
fn test_dirty_frame_flushes_at_eviction() {
    let (pool, dir) = create_pool(1);

    pool.with_sector_mut(SectorAddress(2), |sector| sector[0] = 42)
        .unwrap();
    // loading another page evicts and writes page 1 back
    pool.access(first_sector(3), AccessMode::Read).unwrap();

    let disk = DiskManager::open(dir.path().join("disk")).unwrap();
    let mut sector = vec![0u8; geometry().sector_bytes()];
    disk.read_sector(SectorAddress(2), &mut sector).unwrap();
    assert_eq!(sector[0], 42);
}

#[test]
fn test_flush_all_writes_dirty_frames() {
    let (pool, dir) = create_pool(4);

    pool.with_sector_mut(SectorAddress(4), |sector| sector[0] = 7)
        .unwrap();
    pool.with_sector_mut(SectorAddress(6), |sector| sector[5] = 9)
        .unwrap();
    pool.flush_all().unwrap();

    let disk = DiskManager::open(dir.path().join("disk")).unwrap();
    let mut sector = vec![0u8; geometry().sector_bytes()];
    disk.read_sector(SectorAddress(4), &mut sector).unwrap();
    assert_eq!(sector[0], 7);
    disk.read_sector(SectorAddress(6), &mut sector).unwrap();
    assert_eq!(sector[5], 9);
}

#[test]
fn test_teardown_writes_dirty_frames() {
    let dir = tempfile::tempdir().unwrap();
    let disk = DiskManager::create(dir.path().join("disk"), geometry()).unwrap();
    {
        let pool = BufferPool::new(disk, 4);
        pool.with_sector_mut(SectorAddress(9), |sector| sector[1] = 77)
            .unwrap();
        // dropped dirty
    }

    let disk = DiskManager::open(dir.path().join("disk")).unwrap();
    let mut sector = vec![0u8; geometry().sector_bytes()];
    disk.read_sector(SectorAddress(9), &mut sector).unwrap();
    assert_eq!(sector[1], 77);
}

#[test]
fn test_sector_slices_within_one_page() {
    let (pool, _dir) = create_pool(2);

    // sectors 2 and 3 share page 1 but must not alias
    pool.with_sector_mut(SectorAddress(2), |sector| sector[0] = 1)
        .unwrap();
    pool.with_sector_mut(SectorAddress(3), |sector| sector[0] = 2)
        .unwrap();

    let first = pool.with_sector(SectorAddress(2), |s| s[0]).unwrap();
    let second = pool.with_sector(SectorAddress(3), |s| s[0]).unwrap();
    assert_eq!((first, second), (1, 2));
}

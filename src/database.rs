use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::buffer::{AccessMode, BufferPool, PinGuard, PoolStatus};
use crate::common::{PageId, Result, SectorAddress, SpindleError, DEFAULT_POOL_CAPACITY};
use crate::expr::{self, Expr};
use crate::record::{Schema, Value};
use crate::storage::{DiskGeometry, DiskManager};
use crate::table::{catalog, csv, heap};

/// Outcome of a CSV load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The table did not exist before; `records` rows were written.
    Created { records: usize },
    /// Rows were appended to an existing table's chain.
    Appended { records: usize },
}

impl LoadOutcome {
    pub fn records(&self) -> usize {
        match self {
            LoadOutcome::Created { records } | LoadOutcome::Appended { records } => *records,
        }
    }
}

/// Everything needed to scan one table. Holding it keeps the table's header
/// sector pinned.
struct TableInfo<'a> {
    _header_pin: PinGuard<'a>,
    first_data: SectorAddress,
    schema: Schema,
    capacity: usize,
    bitmap_len: usize,
}

/// The engine handle: owns the geometry, the sector files and the buffer
/// pool, and exposes the operations the REPL dispatches into.
///
/// CSV files are resolved as `<base_dir>/<name>.csv`; the simulated disk
/// lives under `<base_dir>/disk`.
pub struct Database {
    base_dir: PathBuf,
    pool: BufferPool,
}

impl Database {
    /// Creates a fresh disk under `<base_dir>/disk` and opens it.
    pub fn create(base_dir: impl AsRef<Path>, geometry: DiskGeometry) -> Result<Self> {
        Self::create_with_capacity(base_dir, geometry, DEFAULT_POOL_CAPACITY)
    }

    pub fn create_with_capacity(
        base_dir: impl AsRef<Path>,
        geometry: DiskGeometry,
        pool_capacity: usize,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let disk = DiskManager::create(base_dir.join("disk"), geometry)?;
        Ok(Self {
            base_dir,
            pool: BufferPool::new(disk, pool_capacity),
        })
    }

    /// Opens the disk already present under `<base_dir>/disk`.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_capacity(base_dir, DEFAULT_POOL_CAPACITY)
    }

    pub fn open_with_capacity(base_dir: impl AsRef<Path>, pool_capacity: usize) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let disk = DiskManager::open(base_dir.join("disk"))?;
        Ok(Self {
            base_dir,
            pool: BufferPool::new(disk, pool_capacity),
        })
    }

    /// Whether a disk exists under `<base_dir>/disk`.
    pub fn exists(base_dir: impl AsRef<Path>) -> bool {
        base_dir.as_ref().join("disk").is_dir()
    }

    pub fn geometry(&self) -> &DiskGeometry {
        self.pool.geometry()
    }

    /// Loads `<base_dir>/<name>.csv` into the table `name`. A new table is
    /// created from the file's schema line; an existing table keeps its
    /// stored schema and the rows are appended to its chain.
    pub fn load_csv(&self, name: &str) -> Result<LoadOutcome> {
        let path = self.base_dir.join(format!("{name}.csv"));
        let file = File::open(&path).map_err(|_| SpindleError::CsvNotFound(path.clone()))?;
        let mut lines = BufReader::new(file).lines();
        let schema_line = match lines.next() {
            Some(line) => line?,
            None => return Err(SpindleError::Csv(format!("{} is empty", path.display()))),
        };

        if let Some(header) = catalog::search_table(&self.pool, name)? {
            let _pin = self.pool.pin_guard(header)?;
            let (first_data, schema) = self.read_header(header)?;
            let capacity = self.capacity_for(&schema);
            let bitmap_len = heap::bitmap_len(capacity);

            // walk to the tail of the chain
            let mut tail = first_data;
            if tail.is_null() {
                tail = self.append_data_sector(header, bitmap_len)?;
            } else {
                while let Some(next) = self.next_data_sector(tail)? {
                    tail = next;
                }
            }

            let records = self.write_rows(lines, &schema, capacity, bitmap_len, tail)?;
            debug!(table = name, records, "appended to existing table");
            Ok(LoadOutcome::Appended { records })
        } else {
            let schema = csv::parse_schema_line(&schema_line)?;
            let capacity = self.capacity_for(&schema);
            let bitmap_len = heap::bitmap_len(capacity);

            let header = heap::request_empty_sector(&self.pool)?;
            self.pool
                .with_sector_mut(header, |sector| heap::init_table_header(sector, &schema))??;
            catalog::register_table(&self.pool, name, header)?;

            let _pin = self.pool.pin_guard(header)?;
            let first_data = self.append_data_sector(header, bitmap_len)?;
            let records = self.write_rows(lines, &schema, capacity, bitmap_len, first_data)?;
            info!(table = name, records, "table created");
            Ok(LoadOutcome::Created { records })
        }
    }

    /// Prints every live record of the table, in chain order.
    pub fn select_all(&self, name: &str, out: &mut dyn Write) -> Result<()> {
        let info = self.table_info(name)?;
        self.scan(&info, None, false, out)
    }

    /// Prints every live record matching the predicate.
    pub fn select_where(&self, name: &str, predicate: &str, out: &mut dyn Write) -> Result<()> {
        let info = self.table_info(name)?;
        let predicate = expr::parse(predicate, &info.schema)?;
        self.scan(&info, Some(&predicate), false, out)
    }

    /// Prints every live record matching the predicate and clears its live
    /// bit. Slots are tombstoned, never reused; `record_count` stays put.
    pub fn delete_where(&self, name: &str, predicate: &str, out: &mut dyn Write) -> Result<()> {
        let info = self.table_info(name)?;
        let predicate = expr::parse(predicate, &info.schema)?;
        self.scan(&info, Some(&predicate), true, out)
    }

    /// Reports the disk's capacity and free/used split, listing the path of
    /// every free sector.
    pub fn disk_info(&self, out: &mut dyn Write) -> Result<()> {
        let geometry = *self.pool.geometry();
        let total_sectors = geometry.total_sectors();
        let total_bytes = geometry.total_bytes();
        writeln!(out, "Total disk capacity: {total_bytes} bytes")?;

        writeln!(out, "Free sectors:")?;
        let mut free = 0i64;
        for raw in 0..total_sectors {
            let addr = SectorAddress(raw);
            let is_free = self
                .pool
                .with_sector(addr, |sector| sector[..4] == [0, 0, 0, 0])?;
            if is_free {
                free += 1;
                writeln!(out, "{}", self.pool.disk().sector_path(addr).display())?;
            }
        }
        let used = total_sectors as i64 - free;
        let free_bytes = free * geometry.bytes as i64;

        writeln!(out, "{free} sectors free")?;
        writeln!(out, "{used} sectors used")?;
        writeln!(out, "{free_bytes} bytes free")?;
        writeln!(out, "{} bytes used", total_bytes - free_bytes)?;
        Ok(())
    }

    /// Snapshot of the buffer pool (the `BUFFER` hook).
    pub fn buffer_status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Test hook: fault the first sector of `page` in the given mode.
    pub fn request_page(&self, page: i32, mode: AccessMode) -> Result<()> {
        let addr = PageId(page).first_sector(self.geometry().block_size);
        self.pool.access(addr, mode)
    }

    /// Test hook: pin `page` if resident.
    pub fn pin_page(&self, page: i32) {
        self.pool
            .pin(PageId(page).first_sector(self.geometry().block_size));
    }

    /// Test hook: unpin `page` if resident.
    pub fn unpin_page(&self, page: i32) {
        self.pool
            .unpin(PageId(page).first_sector(self.geometry().block_size));
    }

    /// Writes every dirty frame back without waiting for teardown.
    pub fn flush(&self) -> Result<()> {
        self.pool.flush_all()
    }

    fn capacity_for(&self, schema: &Schema) -> usize {
        heap::records_per_sector(self.geometry().sector_bytes(), schema.record_size())
    }

    /// Reads a table header sector: chain head plus schema.
    fn read_header(&self, header: SectorAddress) -> Result<(SectorAddress, Schema)> {
        self.pool.with_sector(header, |sector| {
            let first_data = heap::next_of(sector);
            heap::read_table_schema(sector).map(|schema| (first_data, schema))
        })?
    }

    /// Resolves a table and pins its header for the duration of the borrow.
    fn table_info(&self, name: &str) -> Result<TableInfo<'_>> {
        let header = catalog::search_table(&self.pool, name)?
            .ok_or_else(|| SpindleError::TableNotFound(name.to_string()))?;
        let pin = self.pool.pin_guard(header)?;
        let (first_data, schema) = self.read_header(header)?;
        let capacity = self.capacity_for(&schema);
        Ok(TableInfo {
            _header_pin: pin,
            first_data,
            schema,
            capacity,
            bitmap_len: heap::bitmap_len(capacity),
        })
    }

    fn next_data_sector(&self, addr: SectorAddress) -> Result<Option<SectorAddress>> {
        let next = self.pool.with_sector(addr, heap::next_of)?;
        Ok(if next.is_null() { None } else { Some(next) })
    }

    /// Allocates and initializes a fresh data sector, linking it behind
    /// `prev` (a table header or the current chain tail).
    fn append_data_sector(&self, prev: SectorAddress, bitmap_len: usize) -> Result<SectorAddress> {
        let fresh = heap::request_empty_sector(&self.pool)?;
        self.pool
            .with_sector_mut(fresh, |sector| heap::init_data_sector(sector, bitmap_len))?;
        self.pool
            .with_sector_mut(prev, |sector| heap::set_next(sector, fresh))?;
        Ok(fresh)
    }

    /// Appends CSV lines as records starting at `sector`'s current count,
    /// growing the chain whenever a sector fills up.
    fn write_rows(
        &self,
        lines: Lines<BufReader<File>>,
        schema: &Schema,
        capacity: usize,
        bitmap_len: usize,
        start: SectorAddress,
    ) -> Result<usize> {
        let mut sector = start;
        let mut slot = self.pool.with_sector(sector, heap::record_count)?;
        let mut written = 0usize;

        for line in lines {
            let line = line?;
            if slot == capacity {
                sector = self.append_data_sector(sector, bitmap_len)?;
                slot = 0;
            }
            self.pool.with_sector_mut(sector, |data| -> Result<()> {
                let range = heap::record_range(bitmap_len, slot, schema.record_size());
                csv::encode_record(&line, schema, &mut data[range])?;
                heap::set_live(data, slot, true);
                heap::set_record_count(data, slot + 1);
                Ok(())
            })??;
            slot += 1;
            written += 1;
        }
        Ok(written)
    }

    /// Walks the data chain emitting matching records; in delete mode each
    /// match is tombstoned right after it is printed.
    fn scan(
        &self,
        info: &TableInfo<'_>,
        predicate: Option<&Expr>,
        delete: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut addr = info.first_data;
        while !addr.is_null() {
            let next = if delete {
                self.pool.with_sector_mut(addr, |sector| {
                    scan_sector_mut(sector, info, predicate, &mut *out)
                })??
            } else {
                self.pool.with_sector(addr, |sector| {
                    scan_sector(sector, info, predicate, &mut *out)
                })??
            };
            addr = next;
        }
        Ok(())
    }
}

fn scan_sector(
    sector: &[u8],
    info: &TableInfo<'_>,
    predicate: Option<&Expr>,
    out: &mut dyn Write,
) -> Result<SectorAddress> {
    let count = heap::record_count(sector).min(info.capacity);
    for index in 0..count {
        if !heap::live(sector, index) {
            continue;
        }
        let record = &sector[heap::record_range(info.bitmap_len, index, info.schema.record_size())];
        if selected(predicate, record, &info.schema)? {
            write_record(out, record, &info.schema)?;
        }
    }
    Ok(heap::next_of(sector))
}

fn scan_sector_mut(
    sector: &mut [u8],
    info: &TableInfo<'_>,
    predicate: Option<&Expr>,
    out: &mut dyn Write,
) -> Result<SectorAddress> {
    let count = heap::record_count(sector).min(info.capacity);
    for index in 0..count {
        if !heap::live(sector, index) {
            continue;
        }
        let range = heap::record_range(info.bitmap_len, index, info.schema.record_size());
        if selected(predicate, &sector[range.clone()], &info.schema)? {
            write_record(out, &sector[range], &info.schema)?;
            heap::set_live(sector, index, false);
        }
    }
    Ok(heap::next_of(sector))
}

fn selected(predicate: Option<&Expr>, record: &[u8], schema: &Schema) -> Result<bool> {
    match predicate {
        Some(expr) => expr.matches(record, schema),
        None => Ok(true),
    }
}

/// Prints one record: column values joined by `#`, then a newline.
fn write_record(out: &mut dyn Write, record: &[u8], schema: &Schema) -> Result<()> {
    for (index, column) in schema.columns().enumerate() {
        if index > 0 {
            write!(out, "#")?;
        }
        let value = Value::decode(&record[schema.field_range(index)], column.data_type());
        write!(out, "{value}")?;
    }
    writeln!(out)?;
    Ok(())
}

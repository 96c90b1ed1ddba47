//! Spindle - a tiny relational storage engine over a simulated rotating disk
//!
//! The disk is a directory tree of fixed-size sector files
//! (`disk/p{plate}/f{surface}/t{track}/s{sector}`), addressed by a single
//! integer whose modular decomposition minimizes head movement. All sector
//! access is mediated by a page-grained buffer pool; on top of that sits a
//! column-typed table manager with a CSV loader and a small WHERE-predicate
//! interpreter.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Storage** (`storage`): disk geometry and sector-file I/O
//!   - `DiskGeometry`: the five-field shape persisted in sector 0
//!   - `DiskManager`: directory-tree creation, address-to-path mapping,
//!     whole-sector reads and writes
//!
//! - **Buffer pool** (`buffer`): page caching over the sector files
//!   - `BufferPool`: LRU eviction with pin-skip, dirty write-back, hit-rate
//!     counters
//!   - `PinGuard`: scoped residency guarantee
//!
//! - **Records** (`record`): the typed field layer
//!   - `DataType` / `Column` / `Schema`: fixed-width column layouts
//!   - `Value`: runtime-typed field decoding and printing
//!
//! - **Tables** (`table`): catalog in sector 0, per-table header sectors,
//!   chained data sectors with live bitmaps, CSV ingestion
//!
//! - **Expressions** (`expr`): `WHERE` predicates parsed to a small tree and
//!   evaluated over raw record bytes
//!
//! - **Database** (`database`): the handle tying the layers together and
//!   exposing the REPL's operation surface
//!
//! # Example
//!
//! ```rust,no_run
//! use spindle::{Database, DiskGeometry};
//!
//! let geometry = DiskGeometry {
//!     plates: 1,
//!     tracks: 1,
//!     sectors: 16,
//!     bytes: 512,
//!     block_size: 4,
//! };
//! let db = Database::create(".", geometry).unwrap();
//!
//! // people.csv: name#STRING,age#INT,alive#BOOL + one row per record
//! db.load_csv("people").unwrap();
//!
//! let mut out = Vec::new();
//! db.select_where("people", "age > 30", &mut out).unwrap();
//! print!("{}", String::from_utf8_lossy(&out));
//! ```

pub mod buffer;
pub mod common;
pub mod database;
pub mod expr;
pub mod record;
pub mod storage;
pub mod table;

// Re-export commonly used types at the crate root
pub use common::{PageId, Result, SectorAddress, SpindleError};
pub use database::{Database, LoadOutcome};
pub use storage::DiskGeometry;

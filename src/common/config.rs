/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_CAPACITY: usize = 8;

/// Width of a fixed name slot (table and column names), in bytes.
pub const NAME_LEN: usize = 16;

/// Width of a string field slot, in bytes.
pub const STRING_LEN: usize = 64;

mod buffer_pool;
mod frame;

pub use buffer_pool::{AccessMode, BufferPool, FrameStatus, PinGuard, PoolStatus};
pub use frame::Frame;

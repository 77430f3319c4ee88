//! TICKSCAN State Providers
//!
//! Tick bitmaps, immutable tick snapshots, and the in-memory and sled-backed
//! stores that serve them through `TickStateProvider`.

pub mod bitmap;
pub mod snapshot;
pub mod memory;
pub mod persistent;

pub use bitmap::*;
pub use snapshot::*;
pub use memory::*;
pub use persistent::*;

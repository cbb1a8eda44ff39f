//! An incremental checkpoint/restore engine for the memory image of a logical process (LP)
//! in an optimistic parallel discrete-event simulator.
//!
//! Logically, this crate has these parts:
//! * [`bitset`]: fixed-width bit array backing the use/dirty tracking of a [`chunk::ChunkedArea`].
//! * [`chunk`]: one homogeneous pool of equal-sized chunks, the unit a checkpoint logs.
//! * [`lpmemory`]: an LP's private memory image — the allocation and write-tracking surface
//!   ([`lpmemory::LPMemory::allocate`], [`lpmemory::LPMemory::free`], [`lpmemory::LPMemory::notify_write`]).
//! * [`checkpoint`]: produces full and incremental snapshots of an [`lpmemory::LPMemory`].
//! * [`restore`]: reconstructs an [`lpmemory::LPMemory`] from a checkpoint, chaining through
//!   incrementals to the nearest full log.
//! * [`queue`]: the host's checkpoint-queue navigation contract and fossil collection.
//! * [`blob`]: the self-describing byte format a checkpoint is serialized to.
//! * [`clock`] / [`stats`]: the injected timer and metrics sink the above report through.
//! * [`config`]: engine-wide snapshot scheduling policy.
//! * [`error`]: the recoverable and fatal error kinds the engine raises.

#[macro_use]
extern crate log;

pub mod bitset;
pub mod blob;
pub mod checkpoint;
pub mod chunk;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod lpmemory;
pub mod queue;
pub mod restore;
pub mod stats;

pub use blob::CheckpointBlob;
pub use checkpoint::Checkpointer;
pub use chunk::{ChunkRef, ChunkedArea};
pub use config::{EngineConfig, SnapshotMode};
pub use error::CheckpointError;
pub use lpmemory::LPMemory;
pub use queue::{discard, QueueNode};
pub use restore::Restorer;

#[cfg(feature = "builtin_env_logger")]
pub fn init_logger() {
    let _ = env_logger::try_init();
}

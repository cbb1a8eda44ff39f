//! Engine-wide configuration: how the host wants logs scheduled.

use strum_macros::EnumString;

/// Selects whether [`crate::checkpoint::Checkpointer::checkpoint`] defaults to full or
/// incremental logs. A `force_full` request on an individual LP always wins regardless of
/// this setting; see `Checkpointer::checkpoint`.
#[derive(Copy, Clone, EnumString, Debug, PartialEq, Eq)]
pub enum SnapshotMode {
    Full,
    Incremental,
}

/// Configuration consumed by [`crate::checkpoint::Checkpointer`]. Scheduling logs into the
/// queue, choosing when a rollback happens, and area growth policy are all host concerns
/// and not part of this struct.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub snapshot_mode: SnapshotMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            snapshot_mode: SnapshotMode::Incremental,
        }
    }
}

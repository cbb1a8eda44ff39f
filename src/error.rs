//! Error kinds produced by the checkpoint/restore engine.
//!
//! Only [`CheckpointError::OutOfCapacity`] is recoverable: the host allocator is expected
//! to catch it, grow (or otherwise rebalance) the LP's areas, and retry. Every other variant
//! indicates that the engine's own data structures or the blobs it is handed are corrupt, and
//! the simulation cannot make forward progress; callers should treat them as fatal and abort
//! with the diagnostic attached.

/// Recoverable and fatal error conditions raised by the engine.
#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    /// No area with free chunks large enough for `requested` bytes was found.
    #[error("lp {lp_id}: out of capacity for allocation of {requested} bytes")]
    OutOfCapacity { lp_id: u64, requested: usize },

    /// Backing memory for a blob or a `to_be_restored` bitmap could not be obtained.
    #[error("lp {lp_id}: allocation failed ({what}, {size} bytes)")]
    AllocationFailed {
        lp_id: u64,
        what: &'static str,
        size: usize,
    },

    /// The computed blob size disagreed with the cursor position at the end of
    /// serialization or deserialization.
    #[error("lp {lp_id}: corrupt layout in area {area_idx:?} at offset {offset}: {detail}")]
    CorruptLayout {
        lp_id: u64,
        area_idx: Option<u32>,
        offset: usize,
        detail: String,
    },

    /// Incremental restore walked off the end of the checkpoint queue without finding a
    /// full log to anchor on.
    #[error("lp {lp_id}: incremental restore chain broken, no preceding log")]
    CorruptChain { lp_id: u64 },

    /// `state_changed == 0` was observed together with `dirty_chunks > 0`.
    #[error("lp {lp_id}: area {area_idx} violates invariant: state_changed=0 but dirty_chunks={dirty_chunks}")]
    InvariantViolation {
        lp_id: u64,
        area_idx: u32,
        dirty_chunks: u32,
    },
}

impl CheckpointError {
    /// True for the one error kind the host is expected to catch and retry on; every
    /// other variant is fatal and should abort the simulation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CheckpointError::OutOfCapacity { .. })
    }
}

/// Panics with a diagnostic naming the LP id and any relevant offsets, mirroring how fatal
/// errors are surfaced: there is no recovery path, only a precise postmortem.
pub fn abort_on_fatal(err: CheckpointError) -> ! {
    debug_assert!(!err.is_recoverable());
    panic!("checkpoint engine: fatal error: {err}");
}

//! The checkpoint queue's navigation contract and fossil collection.
//!
//! The engine never walks the queue forward and never schedules logs into it; that
//! belongs to the host. It only needs, for a given node, the blob it carries and the
//! previous (older) node in the chain, which is exactly what incremental restore chains
//! backward through to reach a full log.

use crate::blob::CheckpointBlob;

/// A node in the host's per-LP checkpoint queue. The engine follows `prev` links only; it
/// never inserts, removes, or walks forward.
pub trait QueueNode {
    fn blob(&self) -> &CheckpointBlob;
    fn prev(&self) -> Option<&Self>;
}

/// Releases a fossil log. Tolerates `blob = None` as a no-op.
pub fn discard(blob: Option<CheckpointBlob>) {
    drop(blob);
}

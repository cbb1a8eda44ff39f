//! The self-describing, contiguous byte blob a [`crate::checkpoint::Checkpointer`] produces
//! and a [`crate::restore::Restorer`] consumes. See `cursor` for the bounds-checked reader
//! and writer and `header` for the fixed-layout records that frame it.

pub mod cursor;
pub mod header;

use crate::error::CheckpointError;

pub use cursor::{BlobReader, BlobWriter};
pub use header::{ChunkedAreaHeader, LPMemoryHeader};

/// A checkpoint produced by the engine. Owned by the host once handed back from
/// [`crate::checkpoint::Checkpointer::checkpoint`], until it is released via
/// [`crate::queue::discard`].
#[derive(Clone, Debug)]
pub struct CheckpointBlob {
    bytes: Vec<u8>,
}

impl CheckpointBlob {
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        CheckpointBlob { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads just enough of the header to tell a full log from an incremental one,
    /// without committing to parsing the whole blob.
    pub fn is_incremental(&self, lp_id: u64) -> Result<bool, CheckpointError> {
        let mut reader = BlobReader::new(&self.bytes, lp_id);
        let header = reader.read_header()?;
        Ok(header.is_incremental != 0)
    }

    pub fn reader(&self, lp_id: u64) -> BlobReader<'_> {
        BlobReader::new(&self.bytes, lp_id)
    }
}

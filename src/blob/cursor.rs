//! Bounds-checked cursors over a blob's byte buffer. The original implementation this
//! engine replaces advanced a raw pointer through the log and cast it to record types in
//! place; here every read or write goes through an explicit cursor that cannot walk past
//! the buffer it was given, and overrun is reported as [`CheckpointError::CorruptLayout`]
//! instead of undefined behavior.

use crate::blob::header::{ChunkedAreaHeader, LPMemoryHeader};
use crate::error::CheckpointError;

/// Append-only cursor used while serializing a blob. The buffer is pre-sized by the
/// caller (`full_log_size` / `total_inc_size`), so every `write_*` call is a plain
/// `extend_from_slice` and the only check that matters is the final length assertion
/// the caller performs against the precomputed size.
pub struct BlobWriter {
    pub buf: Vec<u8>,
}

impl BlobWriter {
    pub fn with_capacity(cap: usize) -> Self {
        BlobWriter {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_header(&mut self, header: LPMemoryHeader) {
        self.buf.extend_from_slice(&header.to_bytes());
    }

    pub fn write_area_header(&mut self, header: ChunkedAreaHeader) {
        self.buf.extend_from_slice(&header.to_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Read-only cursor over an existing blob's bytes. Every consuming read checks that enough
/// bytes remain and returns [`CheckpointError::CorruptLayout`] if the blob is truncated
/// relative to what its own header promised.
pub struct BlobReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    lp_id: u64,
}

impl<'a> BlobReader<'a> {
    pub fn new(bytes: &'a [u8], lp_id: u64) -> Self {
        BlobReader { bytes, pos: 0, lp_id }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], CheckpointError> {
        if self.pos + n > self.bytes.len() {
            return Err(CheckpointError::CorruptLayout {
                lp_id: self.lp_id,
                area_idx: None,
                offset: self.pos,
                detail: format!("{what}: need {n} bytes, only {} remain", self.remaining()),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_header(&mut self) -> Result<LPMemoryHeader, CheckpointError> {
        let slice = self.take(LPMemoryHeader::SIZE, "lp memory header")?;
        let mut arr = [0u8; LPMemoryHeader::SIZE];
        arr.copy_from_slice(slice);
        Ok(LPMemoryHeader::from_bytes(arr))
    }

    /// Reads an area header without consuming the cursor, so the caller can decide
    /// whether this logged area matches the live slot it is about to restore into.
    pub fn peek_area_header(&self) -> Result<Option<ChunkedAreaHeader>, CheckpointError> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        if self.remaining() < ChunkedAreaHeader::SIZE {
            return Err(CheckpointError::CorruptLayout {
                lp_id: self.lp_id,
                area_idx: None,
                offset: self.pos,
                detail: "truncated area header".into(),
            });
        }
        let mut arr = [0u8; ChunkedAreaHeader::SIZE];
        arr.copy_from_slice(&self.bytes[self.pos..self.pos + ChunkedAreaHeader::SIZE]);
        Ok(Some(ChunkedAreaHeader::from_bytes(arr)))
    }

    pub fn read_area_header(&mut self) -> Result<ChunkedAreaHeader, CheckpointError> {
        let slice = self.take(ChunkedAreaHeader::SIZE, "chunked area header")?;
        let mut arr = [0u8; ChunkedAreaHeader::SIZE];
        arr.copy_from_slice(slice);
        Ok(ChunkedAreaHeader::from_bytes(arr))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CheckpointError> {
        self.take(n, "payload")
    }
}

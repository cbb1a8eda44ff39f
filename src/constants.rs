//! Sizing constants shared across the blob format and the allocator.

/// log2 of the number of bits in a byte
pub const LOG_BITS_IN_BYTE: u8 = 3;
/// The number of bits in a byte
pub const BITS_IN_BYTE: usize = 1 << LOG_BITS_IN_BYTE;

/// Sentinel `timestamp` value stamped onto an [`crate::lpmemory::LPMemory`] right after a
/// restore, before the host has re-scheduled the LP and learned its true LVT.
pub const SENTINEL_UNKNOWN_TIMESTAMP: u64 = u64::MAX;

/// Bit position of the LOG_MODE flag within [`crate::chunk::ChunkedArea::flags`].
pub const LOG_MODE_BIT: u8 = 0;
/// Bit position of the AREA_LOCK flag within [`crate::chunk::ChunkedArea::flags`].
pub const AREA_LOCK_BIT: u8 = 1;

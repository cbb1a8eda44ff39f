//! Fixed-layout, little-endian records that frame a [`crate::blob::Blob`]. Defined as
//! explicit `repr(C)` structs rather than pointer-chased into a raw byte stream: every
//! field has a named offset, and [`bytemuck::Pod`] gives us a checked, safe cast between
//! the struct and its byte representation instead of an unchecked pointer reinterpret.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// Header of every checkpoint blob, full or incremental.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LPMemoryHeader {
    pub timestamp: u64,
    pub num_areas: u32,
    pub max_num_areas: u32,
    /// Populated in full blobs; zero in incremental ones.
    pub total_log_size: u64,
    /// Populated in incremental blobs; zero in full ones.
    pub total_inc_size: u64,
    pub is_incremental: u8,
    pub _padding: [u8; 7],
}

const_assert_eq!(std::mem::size_of::<LPMemoryHeader>(), 40);

/// Header of one logged [`crate::chunk::ChunkedArea`] within a blob.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ChunkedAreaHeader {
    pub idx: u32,
    pub prev: u32,
    pub next: u32,
    pub num_chunks: u32,
    pub alloc_chunks: u32,
    pub next_chunk: u32,
    pub chunk_size: u32,
    pub tag_bytes: u32,
    /// 0 in full blobs.
    pub dirty_chunks: u32,
    pub flags: u8,
    pub _padding: [u8; 3],
    pub last_access: u64,
}

const_assert_eq!(std::mem::size_of::<ChunkedAreaHeader>(), 48);

impl LPMemoryHeader {
    pub const SIZE: usize = std::mem::size_of::<LPMemoryHeader>();

    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        bytemuck::cast(self)
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        bytemuck::cast(bytes)
    }
}

impl ChunkedAreaHeader {
    pub const SIZE: usize = std::mem::size_of::<ChunkedAreaHeader>();

    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        bytemuck::cast(self)
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        bytemuck::cast(bytes)
    }
}

//! A logical process's private memory image: a collection of [`ChunkedArea`]s plus the
//! allocation and write-tracking surface the instrumentation layer calls into.

use crate::bitset::BitSet;
use crate::blob::header::{ChunkedAreaHeader, LPMemoryHeader};
use crate::chunk::{ChunkRef, ChunkedArea};
use crate::error::CheckpointError;

/// One LP's private memory image.
///
/// `areas` is never truncated: its length is always `max_num_areas`, the high-watermark of
/// areas ever provisioned, so that a restore targeting an earlier, smaller `num_areas` can
/// reuse each area's backing storage rather than reallocate it. `num_areas` is the number
/// of areas logically active right now; slots in `max_num_areas - num_areas..max_num_areas`
/// exist but are dormant.
pub struct LPMemory {
    pub lp_id: u64,
    areas: Vec<ChunkedArea>,
    num_areas: u32,
    /// High-watermark of `num_areas` ever observed. Must be honored on restore because a
    /// future area may have been allocated since the target snapshot.
    pub max_num_areas: u32,
    /// LP virtual time of the memory image's current content.
    pub timestamp: u64,
    /// Size the next full log will occupy, recomputed each time `full()` runs.
    pub total_log_size: u64,
    /// Size the next incremental log will occupy. Always `>= LPMemoryHeader::SIZE` and
    /// maintained incrementally so `incremental()` can allocate in one shot.
    pub total_inc_size: u64,
    /// 1 iff the last log produced was incremental.
    pub is_incremental: bool,
    /// Set by `request_force_full`; consumed (and cleared) by the next `checkpoint`.
    pub force_full: bool,
}

impl LPMemory {
    pub fn new(lp_id: u64) -> Self {
        LPMemory {
            lp_id,
            areas: Vec::new(),
            num_areas: 0,
            max_num_areas: 0,
            timestamp: 0,
            total_log_size: 0,
            total_inc_size: LPMemoryHeader::SIZE as u64,
            is_incremental: false,
            force_full: false,
        }
    }

    pub fn num_areas(&self) -> u32 {
        self.num_areas
    }

    pub fn areas(&self) -> &[ChunkedArea] {
        &self.areas[..self.num_areas as usize]
    }

    pub fn areas_mut(&mut self) -> &mut [ChunkedArea] {
        &mut self.areas[..self.num_areas as usize]
    }

    /// All provisioned slots, including dormant ones past `num_areas`. Used by restore,
    /// which needs to reach into backing storage `max_num_areas` never shrinks below.
    pub(crate) fn all_slots_mut(&mut self) -> &mut Vec<ChunkedArea> {
        &mut self.areas
    }

    pub(crate) fn set_num_areas(&mut self, n: u32) {
        debug_assert!(n <= self.max_num_areas);
        self.num_areas = n;
    }

    /// Appends a freshly provisioned, empty area and activates it, bumping `max_num_areas`
    /// if this is a new high-watermark. Area growth policy beyond this call is the host
    /// allocator's concern.
    pub fn push_area(&mut self, num_chunks: u32, chunk_size: u32, tag_bytes: u32) -> u32 {
        let idx = self.num_areas;
        if (idx as usize) < self.areas.len() {
            self.areas[idx as usize] = ChunkedArea::new(idx, num_chunks, chunk_size, tag_bytes);
        } else {
            self.areas.push(ChunkedArea::new(idx, num_chunks, chunk_size, tag_bytes));
        }
        self.num_areas += 1;
        if self.num_areas > self.max_num_areas {
            self.max_num_areas = self.num_areas;
        }
        idx
    }

    /// Returns the next free chunk in some active area whose `chunk_size` payload covers
    /// `size`, marking it allocated. Fails with `OutOfCapacity` when no active area has a
    /// free chunk that fits; area growth is delegated to the host allocator and out of
    /// scope here.
    pub fn allocate(&mut self, size: usize) -> Result<ChunkRef, CheckpointError> {
        for area in self.areas_mut() {
            if (area.untagged_chunk_size() as usize) < size {
                continue;
            }
            if area.alloc_chunks >= area.num_chunks {
                continue;
            }
            let num_chunks = area.num_chunks;
            let start = area.next_chunk;
            for step in 0..num_chunks {
                let k = (start + step) % num_chunks;
                if !area.use_bitmap.test(k as usize) {
                    area.use_bitmap.set(k as usize);
                    area.alloc_chunks += 1;
                    area.next_chunk = (k + 1) % num_chunks;
                    area.state_changed = true;
                    let chunk = ChunkRef {
                        area_idx: area.idx,
                        chunk_idx: k,
                    };
                    trace!("lp {}: allocated {} ({} bytes)", self.lp_id, chunk, size);
                    return Ok(chunk);
                }
            }
        }
        debug!("lp {}: out of capacity for {} bytes", self.lp_id, size);
        Err(CheckpointError::OutOfCapacity {
            lp_id: self.lp_id,
            requested: size,
        })
    }

    /// Clears the chunk's use bit and marks the area changed. The caller must not free an
    /// already-free chunk; behavior in that case is unspecified and must be rejected by the
    /// caller before it reaches here.
    pub fn free(&mut self, chunk: ChunkRef) {
        let area = &mut self.areas[chunk.area_idx as usize];
        debug_assert!(
            area.use_bitmap.test(chunk.chunk_idx as usize),
            "double free of {chunk}"
        );
        area.use_bitmap.clear(chunk.chunk_idx as usize);
        area.alloc_chunks -= 1;
        area.state_changed = true;
    }

    /// Hook called on every write to LP-owned memory. Sets the chunk's dirty bit; on a
    /// 0→1 transition, bumps `dirty_chunks` and grows `total_inc_size` by the area's
    /// `chunk_size` so the next incremental checkpoint can allocate without rescanning.
    pub fn notify_write(&mut self, chunk: ChunkRef) {
        let area = &mut self.areas[chunk.area_idx as usize];
        let k = chunk.chunk_idx as usize;
        if !area.dirty_bitmap.test(k) {
            area.dirty_bitmap.set(k);
            area.dirty_chunks += 1;
            self.total_inc_size += area.chunk_size as u64;
        }
        area.state_changed = true;
    }

    /// Marks the next checkpoint as required to be full, regardless of the configured
    /// snapshot mode.
    pub fn request_force_full(&mut self) {
        self.force_full = true;
    }

    /// Byte size the next full log will occupy: header, plus for each active area with at
    /// least one allocated chunk, an area header, its use bitmap, and either the wholesale
    /// payload (LOG_MODE set) or just the allocated chunks.
    pub fn full_log_size(&self) -> usize {
        let mut size = LPMemoryHeader::SIZE;
        for area in self.areas() {
            if area.alloc_chunks == 0 {
                continue;
            }
            size += ChunkedAreaHeader::SIZE;
            size += BitSet::required_bytes(area.num_chunks as usize);
            let payload_chunks = if area.log_mode() {
                area.num_chunks
            } else {
                area.alloc_chunks
            };
            size += payload_chunks as usize * area.chunk_size as usize;
        }
        size
    }
}

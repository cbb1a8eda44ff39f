//! Reconstructs an [`LPMemory`] from a checkpoint blob, chaining backward through
//! incremental logs until a full log is reached.
//!
//! Grounded on the two restore paths of the original DyMeLoR/Di-DyMeLoR scheme: a full
//! log is a direct per-area copy; an incremental chain is walked newest-to-oldest with a
//! per-area scratch bitmap (`to_be_restored`) recording which chunks are still owed, so
//! that the first chunk seen while scanning newer-to-older wins and a full log at the
//! bottom of the chain only supplies what no incremental already did.

use crate::bitset::BitSet;
use crate::blob::header::{ChunkedAreaHeader, LPMemoryHeader};
use crate::blob::CheckpointBlob;
use crate::chunk::ChunkedArea;
use crate::clock::Clock;
use crate::constants::SENTINEL_UNKNOWN_TIMESTAMP;
use crate::error::CheckpointError;
use crate::lpmemory::LPMemory;
use crate::queue::QueueNode;
use crate::stats::{Metric, StatsSink};

/// Stateless across LPs, like [`crate::checkpoint::Checkpointer`]: holds only the
/// injected collaborators.
pub struct Restorer<'a> {
    clock: &'a dyn Clock,
    stats: &'a dyn StatsSink,
}

impl<'a> Restorer<'a> {
    pub fn new(clock: &'a dyn Clock, stats: &'a dyn StatsSink) -> Self {
        Restorer { clock, stats }
    }

    /// Restores `lp` from `node`'s blob, dispatching on whether it is a full or
    /// incremental log.
    pub fn restore<Q: QueueNode>(&self, lp: &mut LPMemory, node: &Q) -> Result<(), CheckpointError> {
        if node.blob().is_incremental(lp.lp_id)? {
            self.restore_incremental(lp, node)
        } else {
            self.restore_full(lp, node.blob())
        }
    }

    /// Restores `lp` directly from a full log blob.
    pub fn restore_full(&self, lp: &mut LPMemory, blob: &CheckpointBlob) -> Result<(), CheckpointError> {
        let start = self.clock.now_micros();
        let mut reader = blob.reader(lp.lp_id);
        let header = reader.read_header()?;

        let original_num_areas = lp.num_areas();
        let target_num_areas = header.num_areas;
        let target_max_num_areas = lp.max_num_areas.max(header.max_num_areas);
        grow_slots(lp, target_max_num_areas);

        for i in 0..target_num_areas {
            let logs_here = matches!(reader.peek_area_header()?, Some(h) if h.idx == i);
            let slot = &mut lp.all_slots_mut()[i as usize];
            slot.clear_dirty();

            if !logs_here {
                slot.reset_to_empty_at(header.timestamp);
                continue;
            }

            let area_header = reader.read_area_header()?;
            let use_bitmap = read_bitmap(&mut reader, area_header.num_chunks)?;
            apply_area_header(slot, &area_header, &use_bitmap);

            if slot.log_mode() {
                let payload = reader.read_bytes(slot.area.len())?;
                slot.area.copy_from_slice(payload);
            } else {
                let chunk_size = slot.chunk_size as usize;
                let payload = reader.read_bytes(slot.alloc_chunks as usize * chunk_size)?;
                for (pos, k) in set_bits(&slot.use_bitmap).into_iter().enumerate() {
                    let src = pos * chunk_size;
                    let dst = slot.chunk_offset(k);
                    slot.area[dst..dst + chunk_size].copy_from_slice(&payload[src..src + chunk_size]);
                }
            }
        }

        finish_restore(lp, original_num_areas, target_num_areas, header.timestamp);
        lp.total_log_size = header.total_log_size;

        self.report(start);
        Ok(())
    }

    /// Restores `lp` by walking `node` backward through incremental logs to the nearest
    /// full log, applying newest-wins per-chunk precedence along the way.
    pub fn restore_incremental<Q: QueueNode>(&self, lp: &mut LPMemory, node: &Q) -> Result<(), CheckpointError> {
        let start = self.clock.now_micros();
        let top_header = node.blob().reader(lp.lp_id).read_header()?;

        let original_num_areas = lp.num_areas();
        let target_num_areas = top_header.num_areas;
        let target_max_num_areas = lp.max_num_areas.max(top_header.max_num_areas);
        grow_slots(lp, target_max_num_areas);

        let mut to_be_restored: Vec<Option<BitSet>> = vec![None; target_max_num_areas as usize];
        let mut current: &Q = node;

        loop {
            let blob = current.blob();
            let mut reader = blob.reader(lp.lp_id);
            let header = reader.read_header()?;

            if header.is_incremental == 0 {
                while !reader.at_end() {
                    let area_header = reader.read_area_header()?;
                    let use_bitmap = read_bitmap(&mut reader, area_header.num_chunks)?;
                    let idx = area_header.idx as usize;
                    let chunk_size = area_header.chunk_size as usize;

                    let slot = &mut lp.all_slots_mut()[idx];
                    first_sighting(&mut to_be_restored, slot, &area_header, &use_bitmap);

                    if slot.log_mode() {
                        let payload = reader.read_bytes(slot.area.len())?;
                        for k in set_bits(to_be_restored[idx].as_ref().unwrap()) {
                            let src = k * chunk_size;
                            let dst = slot.chunk_offset(k);
                            slot.area[dst..dst + chunk_size].copy_from_slice(&payload[src..src + chunk_size]);
                            to_be_restored[idx].as_mut().unwrap().clear(k);
                        }
                    } else {
                        for k in set_bits(&use_bitmap) {
                            let payload = reader.read_bytes(chunk_size)?;
                            if to_be_restored[idx].as_ref().unwrap().test(k) {
                                let dst = slot.chunk_offset(k);
                                slot.area[dst..dst + chunk_size].copy_from_slice(payload);
                                to_be_restored[idx].as_mut().unwrap().clear(k);
                            }
                        }
                    }
                }
                break;
            }

            while !reader.at_end() {
                let area_header = reader.read_area_header()?;
                let use_bitmap = read_bitmap(&mut reader, area_header.num_chunks)?;
                let idx = area_header.idx as usize;
                let chunk_size = area_header.chunk_size as usize;

                let slot = &mut lp.all_slots_mut()[idx];
                first_sighting(&mut to_be_restored, slot, &area_header, &use_bitmap);

                if area_header.dirty_chunks > 0 {
                    let dirty_bitmap = read_bitmap(&mut reader, area_header.num_chunks)?;
                    for k in set_bits(&dirty_bitmap) {
                        let payload = reader.read_bytes(chunk_size)?;
                        if to_be_restored[idx].as_ref().unwrap().test(k) {
                            let dst = slot.chunk_offset(k);
                            slot.area[dst..dst + chunk_size].copy_from_slice(payload);
                            to_be_restored[idx].as_mut().unwrap().clear(k);
                        }
                    }
                }
            }

            match current.prev() {
                Some(p) => current = p,
                None => return Err(CheckpointError::CorruptChain { lp_id: lp.lp_id }),
            }
        }

        finish_restore(lp, original_num_areas, target_num_areas, top_header.timestamp);
        lp.total_log_size = top_header.total_log_size;

        self.report(start);
        Ok(())
    }

    fn report(&self, start: u64) {
        let elapsed = self.clock.now_micros().wrapping_sub(start);
        self.stats.post(Metric::Recovery, 1);
        self.stats.post(Metric::RecoveryTime, elapsed);
        trace!("restore: {}us", elapsed);
    }
}

/// Grows the never-shrinking backing storage to at least `n` slots, filling new slots with
/// empty placeholder areas that `first_sighting` / the area-header copy will populate.
fn grow_slots(lp: &mut LPMemory, n: u32) {
    while lp.all_slots_mut().len() < n as usize {
        let idx = lp.all_slots_mut().len() as u32;
        lp.all_slots_mut().push(ChunkedArea::new(idx, 0, 0, 0));
    }
    lp.max_num_areas = lp.max_num_areas.max(n);
}

/// Restores `num_areas` to at least its pre-restore value: trailing areas live before the
/// restore but absent from the target snapshot are reset to empty rather than dropped,
/// since `max_num_areas`-style bookkeeping never shrinks.
fn finish_restore(lp: &mut LPMemory, original_num_areas: u32, target_num_areas: u32, timestamp: u64) {
    let final_num_areas = original_num_areas.max(target_num_areas);
    for i in target_num_areas..final_num_areas {
        lp.all_slots_mut()[i as usize].reset_to_empty_at(timestamp);
    }
    lp.set_num_areas(final_num_areas);
    lp.timestamp = SENTINEL_UNKNOWN_TIMESTAMP;
    lp.is_incremental = false;
    lp.total_inc_size = LPMemoryHeader::SIZE as u64;
}

/// First time an area's `idx` is seen while walking newer-to-older, its live header fields
/// and backing storage are reset to match the logged ones, and `to_be_restored[idx]` is
/// seeded with a copy of the bitmap recording what still needs to come from an older log.
fn first_sighting(
    to_be_restored: &mut [Option<BitSet>],
    slot: &mut ChunkedArea,
    header: &ChunkedAreaHeader,
    use_bitmap: &BitSet,
) {
    let idx = header.idx as usize;
    if to_be_restored[idx].is_some() {
        return;
    }
    to_be_restored[idx] = Some(use_bitmap.clone());
    apply_area_header(slot, header, use_bitmap);
}

fn apply_area_header(slot: &mut ChunkedArea, header: &ChunkedAreaHeader, use_bitmap: &BitSet) {
    slot.idx = header.idx;
    slot.prev = header.prev;
    slot.next = header.next;
    slot.num_chunks = header.num_chunks;
    slot.alloc_chunks = header.alloc_chunks;
    slot.next_chunk = header.next_chunk;
    slot.chunk_size = header.chunk_size;
    slot.tag_bytes = header.tag_bytes;
    slot.flags = header.flags;
    slot.last_access = header.last_access;
    slot.use_bitmap = use_bitmap.clone();
    slot.state_changed = false;
    slot.dirty_chunks = 0;

    let want_len = header.num_chunks as usize * header.chunk_size as usize;
    if slot.area.len() != want_len {
        slot.area = vec![0u8; want_len];
    }
    if slot.dirty_bitmap.len() != header.num_chunks as usize {
        slot.dirty_bitmap = BitSet::new(header.num_chunks as usize);
    } else {
        slot.dirty_bitmap.clear_all();
    }
}

fn read_bitmap(reader: &mut crate::blob::BlobReader<'_>, num_chunks: u32) -> Result<BitSet, CheckpointError> {
    let bytes = reader.read_bytes(BitSet::required_bytes(num_chunks as usize))?;
    Ok(BitSet::from_bytes(num_chunks as usize, bytes))
}

fn set_bits(bs: &BitSet) -> Vec<usize> {
    let mut v = Vec::new();
    bs.foreach_set(|i| v.push(i));
    v
}

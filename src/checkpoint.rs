//! Produces full and incremental snapshots of an [`LPMemory`].
//!
//! Grounded on the two log functions in the original DyMeLoR/Di-DyMeLoR checkpointing
//! scheme: a full log dumps every allocated chunk and re-establishes a clean dirty
//! baseline; an incremental log dumps only the chunks written since the previous
//! checkpoint, sized in one shot from the running `total_inc_size` counter.

use crate::blob::header::{ChunkedAreaHeader, LPMemoryHeader};
use crate::blob::{BlobWriter, CheckpointBlob};
use crate::clock::Clock;
use crate::config::{EngineConfig, SnapshotMode};
use crate::error::CheckpointError;
use crate::lpmemory::LPMemory;
use crate::stats::{Metric, StatsSink};

/// Stateless across LPs: holds only the injected collaborators (timer, metrics sink),
/// never LP-specific state. Every operation takes the `lp` it acts on explicitly.
pub struct Checkpointer<'a> {
    clock: &'a dyn Clock,
    stats: &'a dyn StatsSink,
}

impl<'a> Checkpointer<'a> {
    pub fn new(clock: &'a dyn Clock, stats: &'a dyn StatsSink) -> Self {
        Checkpointer { clock, stats }
    }

    /// Produces a full or incremental snapshot of `lp` at virtual time `lvt`.
    ///
    /// A full log is taken when `force_full` is set, when a previous call to
    /// [`crate::lpmemory::LPMemory::request_force_full`] left `lp.force_full` set, or when
    /// `config.snapshot_mode` is [`SnapshotMode::Full`]; otherwise an incremental log is
    /// taken. Either way `lp.force_full` is cleared before returning.
    pub fn checkpoint(
        &self,
        lp: &mut LPMemory,
        lvt: u64,
        config: &EngineConfig,
        force_full: bool,
    ) -> Result<CheckpointBlob, CheckpointError> {
        let start = self.clock.now_micros();

        let take_full = force_full || lp.force_full || config.snapshot_mode == SnapshotMode::Full;
        let blob = if take_full {
            self.full(lp, lvt)
        } else {
            self.incremental(lp, lvt)
        }?;
        lp.force_full = false;

        let elapsed = self.clock.now_micros().wrapping_sub(start);
        self.stats.post(Metric::Ckpt, 1);
        self.stats.post(Metric::CkptTime, elapsed);
        self.stats.post(Metric::CkptMem, blob.len() as u64);
        debug!(
            "lp {}: {} checkpoint, {} bytes, {}us",
            lp.lp_id,
            if take_full { "full" } else { "incremental" },
            blob.len(),
            elapsed
        );

        Ok(blob)
    }

    /// Dumps every allocated chunk and re-establishes a clean dirty baseline on every area,
    /// whether or not that area ends up logged.
    fn full(&self, lp: &mut LPMemory, lvt: u64) -> Result<CheckpointBlob, CheckpointError> {
        let size = lp.full_log_size();
        let mut w = BlobWriter::with_capacity(size);

        w.write_header(LPMemoryHeader {
            timestamp: lvt,
            num_areas: lp.num_areas(),
            max_num_areas: lp.max_num_areas,
            total_log_size: size as u64,
            total_inc_size: 0,
            is_incremental: 0,
            _padding: [0; 7],
        });

        for area in lp.areas_mut() {
            // A full log re-establishes the clean baseline regardless of whether this
            // area ends up logged below.
            area.clear_dirty();

            if area.alloc_chunks == 0 {
                continue;
            }

            w.write_area_header(ChunkedAreaHeader {
                idx: area.idx,
                prev: area.prev,
                next: area.next,
                num_chunks: area.num_chunks,
                alloc_chunks: area.alloc_chunks,
                next_chunk: area.next_chunk,
                chunk_size: area.chunk_size,
                tag_bytes: area.tag_bytes,
                dirty_chunks: 0,
                flags: area.flags,
                _padding: [0; 3],
                last_access: area.last_access,
            });
            w.write_bytes(&area.use_bitmap.to_bytes());

            let chunk_size = area.chunk_size as usize;
            if area.log_mode() {
                w.write_bytes(&area.area);
            } else {
                let mut payload = Vec::with_capacity(area.alloc_chunks as usize * chunk_size);
                area.use_bitmap.foreach_set(|k| {
                    let off = area.chunk_offset(k);
                    payload.extend_from_slice(&area.area[off..off + chunk_size]);
                });
                w.write_bytes(&payload);
            }
        }

        if w.position() != size {
            return Err(CheckpointError::CorruptLayout {
                lp_id: lp.lp_id,
                area_idx: None,
                offset: w.position(),
                detail: format!("full log: expected {size} bytes, wrote {}", w.position()),
            });
        }

        lp.total_log_size = size as u64;
        lp.total_inc_size = LPMemoryHeader::SIZE as u64;
        lp.is_incremental = false;
        lp.timestamp = lvt;

        Ok(CheckpointBlob::from_bytes(w.into_bytes()))
    }

    /// Dumps only the chunks dirtied since the previous checkpoint, sized in one shot from
    /// the area-by-area `total_inc_size` counter `notify_write` maintains.
    fn incremental(&self, lp: &mut LPMemory, lvt: u64) -> Result<CheckpointBlob, CheckpointError> {
        let size = lp.total_inc_size as usize;
        let mut w = BlobWriter::with_capacity(size);

        w.write_header(LPMemoryHeader {
            timestamp: lvt,
            num_areas: lp.num_areas(),
            max_num_areas: lp.max_num_areas,
            total_log_size: 0,
            total_inc_size: size as u64,
            is_incremental: 1,
            _padding: [0; 7],
        });

        for area in lp.areas_mut() {
            if !area.state_changed {
                if area.dirty_chunks != 0 {
                    return Err(CheckpointError::InvariantViolation {
                        lp_id: lp.lp_id,
                        area_idx: area.idx,
                        dirty_chunks: area.dirty_chunks,
                    });
                }
                continue;
            }

            w.write_area_header(ChunkedAreaHeader {
                idx: area.idx,
                prev: area.prev,
                next: area.next,
                num_chunks: area.num_chunks,
                alloc_chunks: area.alloc_chunks,
                next_chunk: area.next_chunk,
                chunk_size: area.chunk_size,
                tag_bytes: area.tag_bytes,
                dirty_chunks: area.dirty_chunks,
                flags: area.flags,
                _padding: [0; 3],
                last_access: area.last_access,
            });
            w.write_bytes(&area.use_bitmap.to_bytes());

            if area.dirty_chunks == 0 {
                // Allocation bitmap changed but no chunk contents did.
                area.state_changed = false;
                continue;
            }

            w.write_bytes(&area.dirty_bitmap.to_bytes());

            let chunk_size = area.chunk_size as usize;
            let mut payload = Vec::with_capacity(area.dirty_chunks as usize * chunk_size);
            area.dirty_bitmap.foreach_set(|k| {
                let off = area.chunk_offset(k);
                payload.extend_from_slice(&area.area[off..off + chunk_size]);
            });
            w.write_bytes(&payload);

            area.state_changed = false;
            area.dirty_chunks = 0;
            area.dirty_bitmap.clear_all();
        }

        if w.position() != size {
            return Err(CheckpointError::CorruptLayout {
                lp_id: lp.lp_id,
                area_idx: None,
                offset: w.position(),
                detail: format!("incremental log: expected {size} bytes, wrote {}", w.position()),
            });
        }

        lp.total_inc_size = LPMemoryHeader::SIZE as u64;
        lp.is_incremental = true;
        lp.timestamp = lvt;

        Ok(CheckpointBlob::from_bytes(w.into_bytes()))
    }
}

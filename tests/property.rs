//! Seeded random-operation tests for the invariants listed in the engine's spec: a clean
//! post-checkpoint dirty state, full-checkpoint fidelity, and incremental-chain fidelity
//! against a plain shadow model. Not an encode/decode round-trip grid: every case here
//! drives the allocator and checkpointer through a sequence of real operations first.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use rootcheck::checkpoint::Checkpointer;
use rootcheck::clock::MonotonicClock;
use rootcheck::config::EngineConfig;
use rootcheck::restore::Restorer;
use rootcheck::stats::NullStatsSink;
use rootcheck::{CheckpointBlob, ChunkRef, LPMemory, QueueNode};

const NUM_AREAS: u32 = 3;
const CHUNKS_PER_AREA: u32 = 6;
const CHUNK_SIZE: u32 = 8;

struct Node {
    blob: CheckpointBlob,
    prev: Option<Box<Node>>,
}

impl QueueNode for Node {
    fn blob(&self) -> &CheckpointBlob {
        &self.blob
    }

    fn prev(&self) -> Option<&Self> {
        self.prev.as_deref()
    }
}

/// Plain-Rust mirror of the chunks an LPMemory should contain, used as the oracle.
#[derive(Clone)]
struct ShadowArea {
    allocated: Vec<bool>,
    bytes: Vec<Vec<u8>>,
}

fn new_lp_and_shadow(lp_id: u64) -> (LPMemory, Vec<ShadowArea>) {
    let mut lp = LPMemory::new(lp_id);
    let mut shadow = Vec::new();
    for _ in 0..NUM_AREAS {
        lp.push_area(CHUNKS_PER_AREA, CHUNK_SIZE, 0);
        shadow.push(ShadowArea {
            allocated: vec![false; CHUNKS_PER_AREA as usize],
            bytes: vec![vec![0u8; CHUNK_SIZE as usize]; CHUNKS_PER_AREA as usize],
        });
    }
    (lp, shadow)
}

/// Applies one random allocate/free/write step to both the real LP and the shadow model,
/// keeping live `ChunkRef`s around so frees and writes target chunks actually in use.
fn apply_random_step(
    rng: &mut ChaCha8Rng,
    lp: &mut LPMemory,
    shadow: &mut [ShadowArea],
    live: &mut Vec<ChunkRef>,
) {
    let pick = rng.random_range(0..3);
    if pick == 0 || live.is_empty() {
        if let Ok(chunk) = lp.allocate(CHUNK_SIZE as usize) {
            shadow[chunk.area_idx as usize].allocated[chunk.chunk_idx as usize] = true;
            live.push(chunk);
        }
    } else if pick == 1 {
        let i = rng.random_range(0..live.len());
        let chunk = live.swap_remove(i);
        lp.free(chunk);
        shadow[chunk.area_idx as usize].allocated[chunk.chunk_idx as usize] = false;
    } else {
        let i = rng.random_range(0..live.len());
        let chunk = live[i];
        let byte = rng.random::<u8>();
        let off = lp.areas()[chunk.area_idx as usize].chunk_offset(chunk.chunk_idx as usize);
        lp.areas_mut()[chunk.area_idx as usize].area[off..off + CHUNK_SIZE as usize].fill(byte);
        lp.notify_write(chunk);
        shadow[chunk.area_idx as usize].bytes[chunk.chunk_idx as usize] = vec![byte; CHUNK_SIZE as usize];
    }
}

fn assert_matches_shadow(lp: &LPMemory, shadow: &[ShadowArea]) {
    for (area_idx, expected) in shadow.iter().enumerate() {
        let area = &lp.areas()[area_idx];
        for k in 0..CHUNKS_PER_AREA as usize {
            assert_eq!(
                area.use_bitmap.test(k),
                expected.allocated[k],
                "area {area_idx} chunk {k} allocation mismatch"
            );
            if expected.allocated[k] {
                let off = area.chunk_offset(k);
                assert_eq!(
                    &area.area[off..off + CHUNK_SIZE as usize],
                    &expected.bytes[k][..],
                    "area {area_idx} chunk {k} contents mismatch"
                );
            }
        }
    }
}

/// Every checkpoint, full or incremental, must leave every area's dirty-tracking state
/// clean: `state_changed` false and `dirty_chunks` zero. Spec invariant 1.
#[test]
fn every_checkpoint_leaves_dirty_state_clean() {
    let clock = MonotonicClock::new();
    let stats = NullStatsSink;
    let checkpointer = Checkpointer::new(&clock, &stats);
    let config = EngineConfig::default();

    let mut rng = ChaCha8Rng::seed_from_u64(0xC0FFEE);
    let (mut lp, mut shadow) = new_lp_and_shadow(1);
    let mut live = Vec::new();

    for round in 0..200u64 {
        for _ in 0..5 {
            apply_random_step(&mut rng, &mut lp, &mut shadow, &mut live);
        }
        let force_full = round % 17 == 0;
        checkpointer.checkpoint(&mut lp, round, &config, force_full).unwrap();

        for area in lp.areas() {
            assert!(!area.state_changed, "round {round}: area {} still dirty", area.idx);
            assert_eq!(area.dirty_chunks, 0, "round {round}: area {} has dirty chunks", area.idx);
            assert_eq!(area.dirty_bitmap.count_ones(), 0, "round {round}: dirty bitmap not cleared");
        }
    }
}

/// A full checkpoint, restored in isolation, must reproduce the exact allocation and byte
/// state at the moment it was taken. Spec invariant 3.
#[test]
fn full_checkpoint_reproduces_exact_state() {
    let clock = MonotonicClock::new();
    let stats = NullStatsSink;
    let checkpointer = Checkpointer::new(&clock, &stats);
    let restorer = Restorer::new(&clock, &stats);
    let config = EngineConfig::default();

    let mut rng = ChaCha8Rng::seed_from_u64(0xDEADBEEF);
    let (mut lp, mut shadow) = new_lp_and_shadow(2);
    let mut live = Vec::new();

    for round in 0..50u64 {
        for _ in 0..9 {
            apply_random_step(&mut rng, &mut lp, &mut shadow, &mut live);
        }

        let blob = checkpointer.checkpoint(&mut lp, round, &config, true).unwrap();
        assert!(!blob.is_incremental(lp.lp_id).unwrap());

        let mut restored = LPMemory::new(2);
        restorer.restore_full(&mut restored, &blob).unwrap();
        assert_matches_shadow(&restored, &shadow);
    }
}

/// A chain of one full log followed by several incremental logs, restored end to end, must
/// reproduce the state at the moment of the *last* incremental checkpoint: every later write
/// wins over an earlier one to the same chunk, and untouched chunks fall through to the full
/// log. Spec invariants 4 and 5.
#[test]
fn incremental_chain_reproduces_latest_state_with_newest_wins() {
    let clock = MonotonicClock::new();
    let stats = NullStatsSink;
    let checkpointer = Checkpointer::new(&clock, &stats);
    let restorer = Restorer::new(&clock, &stats);
    let config = EngineConfig::default();

    let mut rng = ChaCha8Rng::seed_from_u64(0x1234_5678);
    let (mut lp, mut shadow) = new_lp_and_shadow(3);
    let mut live = Vec::new();

    for _ in 0..6 {
        apply_random_step(&mut rng, &mut lp, &mut shadow, &mut live);
    }
    let full_blob = checkpointer.checkpoint(&mut lp, 0, &config, true).unwrap();
    let mut chain = Node { blob: full_blob, prev: None };

    let mut final_shadow = shadow.clone();
    for round in 1..=20u64 {
        for _ in 0..4 {
            apply_random_step(&mut rng, &mut lp, &mut final_shadow, &mut live);
        }
        let inc_blob = checkpointer.checkpoint(&mut lp, round, &config, false).unwrap();
        assert!(inc_blob.is_incremental(lp.lp_id).unwrap());
        chain = Node { blob: inc_blob, prev: Some(Box::new(chain)) };
    }

    let mut restored = LPMemory::new(3);
    restorer.restore(&mut restored, &chain).unwrap();
    assert_matches_shadow(&restored, &final_shadow);
}

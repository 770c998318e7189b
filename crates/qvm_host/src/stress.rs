//! Concurrent allocation stress harness.
//!
//! Spawns a pool of workers that all claim blocks from one shared arena
//! until it refuses them, then audits the full set of claimed blocks
//! against the arena's invariants: every block aligned, every pair
//! disjoint, and the watermark equal to the bytes actually handed out.
//! A violation here would mean the lock-free watermark raced.

use anyhow::{Result, bail, ensure};
use qvm_common::mem::{ARENA_SIZE, MEM_ALIGNMENT};
use qvm_core::arena::{Arena, MemoryBlock};
use rayon::prelude::*;

pub fn run_stress(workers: usize, request: usize) -> Result<()> {
    ensure!(workers > 0, "at least one worker required");
    ensure!(request > 0, "request size must be non-zero");

    let arena = Box::new(Arena::<ARENA_SIZE>::new());

    let per_worker: Vec<(Vec<MemoryBlock>, usize)> = (0..workers)
        .into_par_iter()
        .map(|_| {
            let mut claimed = Vec::new();
            let mut refused = 0usize;
            loop {
                let Ok(block) = arena.try_allocate(request) else {
                    refused += 1;
                    break;
                };
                claimed.push(block);
            }
            (claimed, refused)
        })
        .collect();

    let refused: usize = per_worker.iter().map(|(_, r)| *r).sum();
    let mut blocks: Vec<MemoryBlock> = per_worker
        .into_iter()
        .flat_map(|(claimed, _)| claimed)
        .collect();
    blocks.sort_by_key(MemoryBlock::offset);

    audit_blocks(&blocks, arena.watermark())?;

    let bytes: usize = blocks.iter().map(MemoryBlock::len).sum();
    println!("Arena Stress Audit");
    println!("Workers:   {workers}");
    println!("Request:   {request} B (rounded to {})", request.next_multiple_of(MEM_ALIGNMENT));
    println!("Claimed:   {} blocks / {} B", blocks.len(), bytes);
    println!("Refused:   {refused}");
    println!("Watermark: {} / {} B", arena.watermark(), ARENA_SIZE);
    println!("Audit:     clean (aligned, disjoint, watermark consistent)");
    Ok(())
}

fn audit_blocks(blocks: &[MemoryBlock], watermark: usize) -> Result<()> {
    for block in blocks {
        if block.offset() % MEM_ALIGNMENT != 0 {
            bail!("misaligned block at offset {}", block.offset());
        }
    }

    for pair in blocks.windows(2) {
        if pair[0].offset() + pair[0].len() > pair[1].offset() {
            bail!(
                "overlapping blocks at offsets {} and {}",
                pair[0].offset(),
                pair[1].offset()
            );
        }
    }

    let bytes: usize = blocks.iter().map(MemoryBlock::len).sum();
    if bytes != watermark {
        bail!("watermark {watermark} disagrees with {bytes} claimed bytes");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(offset: usize, len: usize) -> MemoryBlock {
        MemoryBlock::from_raw_parts(offset, len)
    }

    #[test]
    fn clean_audit_passes() {
        let blocks = [block(0, 16), block(16, 8), block(24, 8)];
        audit_blocks(&blocks, 32).unwrap();
    }

    #[test]
    fn overlap_is_detected() {
        let blocks = [block(0, 16), block(8, 8)];
        assert!(audit_blocks(&blocks, 24).is_err());
    }

    #[test]
    fn watermark_drift_is_detected() {
        let blocks = [block(0, 16)];
        assert!(audit_blocks(&blocks, 24).is_err());
    }
}

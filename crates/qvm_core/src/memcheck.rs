//! Validation policies for arena memory blocks.
//!
//! Two policies are exposed, mirroring the two trust levels a block can
//! require before use. The lenient check is a sanity filter for blocks of
//! unknown provenance; the strict check is a precondition gate for blocks
//! about to be handed to hardware-adjacent code, where a bad range would
//! corrupt memory the runtime does not own. Both are pure: checking a block
//! twice yields the same answer, and neither touches the arena.

use qvm_common::mem::MEM_ALIGNMENT;

use crate::arena::{Arena, MemoryBlock};

/// Lenient sanity check on a block's shape.
///
/// Accepts any non-empty block whose end offset is representable. Says
/// nothing about whether the block belongs to a particular arena; callers
/// that need that guarantee use [`require_arena_backed`]. Returns the
/// verdict and lets the caller decide what to do with it.
pub fn check_block(block: &MemoryBlock) -> bool {
    block.len() > 0 && block.offset().checked_add(block.len()).is_some()
}

/// Strict check that a block is arena-backed and aligned.
///
/// Requires everything [`check_block`] does, plus that the whole range lies
/// within the arena's capacity and the block offset satisfies the
/// allocator's alignment invariant.
///
/// # Panics
///
/// Violations are fatal: a block outside the arena or misaligned means a
/// programming invariant was broken (a corrupted watermark, a forged
/// block), and any subsequent hardware interaction through it would be
/// undefined. There is no safe unwind target in the firmware image, so the
/// process terminates at the point of detection.
pub fn require_arena_backed<const N: usize>(arena: &Arena<N>, block: &MemoryBlock) {
    if !check_block(block) {
        panic!("invalid memory block: empty or overflowing range");
    }
    if block.offset() + block.len() > arena.capacity() {
        panic!(
            "memory block escapes arena: offset {} len {} capacity {}",
            block.offset(),
            block.len(),
            arena.capacity()
        );
    }
    if block.offset() % MEM_ALIGNMENT != 0 {
        panic!("memory block misaligned: offset {}", block.offset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_allocations_pass_both_policies() {
        let arena: Arena<128> = Arena::new();
        let block = arena.allocate(16).unwrap();

        assert!(check_block(&block));
        require_arena_backed(&arena, &block);
    }

    #[test]
    fn validation_is_idempotent_and_pure() {
        let arena: Arena<128> = Arena::new();
        let block = arena.allocate(16).unwrap();
        let watermark = arena.watermark();

        let first = check_block(&block);
        let second = check_block(&block);
        assert_eq!(first, second);

        require_arena_backed(&arena, &block);
        require_arena_backed(&arena, &block);
        assert_eq!(arena.watermark(), watermark);
    }

    #[test]
    fn empty_block_fails_leniently() {
        let block = MemoryBlock::from_raw_parts(0, 0);
        assert!(!check_block(&block));
    }

    #[test]
    fn overflowing_block_fails_leniently() {
        let block = MemoryBlock::from_raw_parts(usize::MAX, 8);
        assert!(!check_block(&block));
    }

    #[test]
    #[should_panic(expected = "escapes arena")]
    fn out_of_arena_block_is_fatal() {
        let arena: Arena<64> = Arena::new();
        let block = MemoryBlock::from_raw_parts(56, 16);
        require_arena_backed(&arena, &block);
    }

    #[test]
    #[should_panic(expected = "misaligned")]
    fn misaligned_block_is_fatal() {
        let arena: Arena<64> = Arena::new();
        let block = MemoryBlock::from_raw_parts(3, 8);
        require_arena_backed(&arena, &block);
    }
}

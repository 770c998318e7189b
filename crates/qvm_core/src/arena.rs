//! Bump arena for the runtime's fixed capture memory region.
//!
//! Provides a thread-safe, lock-free arena that hands out monotonically
//! increasing byte ranges from a fixed backing buffer. Allocations are never
//! freed, making this suitable for run-to-completion firmware images where
//! memory is reserved up front and lifetime management is explicit. The
//! arena uses atomic operations to support concurrent allocation from the
//! main thread of execution and interrupt handlers alike.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use qvm_common::mem::MEM_ALIGNMENT;

use crate::RtError;

/// A range of bytes previously handed out by [`Arena::allocate`].
///
/// Blocks are plain offset/length pairs into a specific arena's storage, so
/// there is no pointer to go stale or fall outside addressable memory: a
/// block is meaningful only together with the arena that produced it. Blocks
/// are exclusively owned by whichever caller received them; since the arena
/// never reclaims memory, ownership never needs to be relinquished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlock {
    /// Byte offset of the block within the arena storage.
    offset: usize,

    /// Length of the block in bytes, already rounded to the alignment.
    len: usize,
}

impl MemoryBlock {
    /// Describes a region from raw parts, without any validity guarantee.
    ///
    /// Exists so drivers and diagnostics can describe regions that did not
    /// come out of [`Arena::allocate`] and feed them to the bounds checker;
    /// a block built this way earns no trust until it has been validated.
    pub const fn from_raw_parts(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Byte offset of the block within its arena.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the block in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the block is empty. Allocation never produces one.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Fixed-capacity arena with an atomically advancing watermark.
///
/// Manages `N` bytes of storage by maintaining a single watermark offset
/// that only ever moves forward. Each allocation rounds its size up to
/// [`MEM_ALIGNMENT`] and claims the next range with a compare-and-retry
/// loop, so concurrent callers always receive disjoint ranges without
/// blocking. There is no deallocation: determinism is bought by never
/// reusing memory, and callers treat exhaustion as an ordinary outcome.
pub struct Arena<const N: usize> {
    /// Backing storage for every block the arena will ever hand out.
    storage: UnsafeCell<[u8; N]>,

    /// Boundary between allocated and unallocated storage.
    ///
    /// Monotonically non-decreasing for the arena's lifetime. Advanced
    /// atomically during allocation to prevent races between concurrent
    /// allocators.
    watermark: AtomicUsize,
}

/// Arena is safe to share between execution contexts.
///
/// The atomic watermark guarantees concurrent allocations receive disjoint
/// ranges, and each block is exclusively owned by its caller afterwards, so
/// no two contexts ever touch the same storage bytes.
unsafe impl<const N: usize> Sync for Arena<N> {}

impl<const N: usize> Default for Arena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Arena<N> {
    /// Creates an empty arena with the watermark at zero.
    ///
    /// `const` so firmware can place the arena in a `static` and pass it
    /// by reference, and so tests can build small independent arenas.
    pub const fn new() -> Self {
        Self {
            storage: UnsafeCell::new([0u8; N]),
            watermark: AtomicUsize::new(0),
        }
    }

    /// Total capacity of the backing storage in bytes.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current boundary between allocated and unallocated storage.
    pub fn watermark(&self) -> usize {
        self.watermark.load(Ordering::Relaxed)
    }

    /// Bytes still available for allocation.
    pub fn remaining(&self) -> usize {
        N - self.watermark()
    }

    /// Claims the next `size` bytes, rounded up to [`MEM_ALIGNMENT`].
    ///
    /// Lock-free: reads the current watermark, computes the candidate new
    /// watermark, and attempts to install it with a single compare-exchange.
    /// If another context won the race, the computation retries against the
    /// freshly observed watermark. Safe to call from interrupt handlers; it
    /// never blocks or sleeps.
    ///
    /// Returns `None` when the rounded request does not fit in the
    /// remaining capacity (the watermark is left untouched by a failed
    /// call), when `size` is zero, or when rounding would overflow.
    /// Exhaustion is an ordinary, checkable outcome — not a bug path.
    pub fn allocate(&self, size: usize) -> Option<MemoryBlock> {
        if size == 0 {
            return None;
        }
        let rounded = size.checked_add(MEM_ALIGNMENT - 1)? & !(MEM_ALIGNMENT - 1);

        let mut current = self.watermark.load(Ordering::Relaxed);
        loop {
            let next = current.checked_add(rounded)?;
            if next > N {
                return None;
            }

            match self.watermark.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Some(MemoryBlock {
                        offset: current,
                        len: rounded,
                    });
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Claims like [`Arena::allocate`], reporting exhaustion as an error.
    ///
    /// Convenience for callers that propagate failures with `?` instead of
    /// matching on `Option`; the allocation semantics are identical.
    pub fn try_allocate(&self, size: usize) -> Result<MemoryBlock, RtError> {
        self.allocate(size).ok_or(RtError::OutOfMemory)
    }

    /// Claims a block like [`Arena::allocate`], then zero-fills it.
    ///
    /// A distinct entry point rather than a flag: zeroing adds O(size) work
    /// per allocation, and callers that rely on fresh blocks reading as
    /// zero must opt into that contract explicitly.
    pub fn allocate_zeroed(&self, size: usize) -> Option<MemoryBlock> {
        let block = self.allocate(size)?;
        unsafe {
            let base = (self.storage.get() as *mut u8).add(block.offset);
            core::ptr::write_bytes(base, 0, block.len);
        }
        Some(block)
    }

    /// Read-only view of an allocated block's bytes.
    ///
    /// # Panics
    ///
    /// Panics if the block does not lie entirely within the allocated
    /// extent of this arena. A block that fails this check was forged or
    /// belongs to a different arena; touching storage through it would
    /// corrupt hardware-adjacent memory, so the failure is fatal.
    pub fn bytes(&self, block: &MemoryBlock) -> &[u8] {
        self.require_allocated(block);
        unsafe {
            let base = (self.storage.get() as *const u8).add(block.offset);
            core::slice::from_raw_parts(base, block.len)
        }
    }

    /// Mutable view of an allocated block's bytes.
    ///
    /// Sound only under the block ownership contract: every block has a
    /// single owner, and the arena never hands out overlapping ranges, so
    /// distinct blocks never alias. The caller must not materialize two
    /// live views of the same block.
    ///
    /// # Panics
    ///
    /// Panics if the block does not lie entirely within the allocated
    /// extent of this arena.
    #[allow(clippy::mut_from_ref)]
    pub fn bytes_mut(&self, block: &MemoryBlock) -> &mut [u8] {
        self.require_allocated(block);
        unsafe {
            let base = (self.storage.get() as *mut u8).add(block.offset);
            core::slice::from_raw_parts_mut(base, block.len)
        }
    }

    /// Stores a 64-bit value into the first eight bytes of a block.
    ///
    /// # Panics
    ///
    /// Panics if the block is shorter than eight bytes or fails the
    /// allocated-extent check.
    pub fn store_u64(&self, block: &MemoryBlock, value: u64) {
        let bytes = self.bytes_mut(block);
        assert!(bytes.len() >= 8, "block too small for a 64-bit store");
        bytes[..8].copy_from_slice(&value.to_le_bytes());
    }

    /// Loads the 64-bit value from the first eight bytes of a block.
    ///
    /// # Panics
    ///
    /// Panics if the block is shorter than eight bytes or fails the
    /// allocated-extent check.
    pub fn load_u64(&self, block: &MemoryBlock) -> u64 {
        let bytes = self.bytes(block);
        assert!(bytes.len() >= 8, "block too small for a 64-bit load");
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        u64::from_le_bytes(raw)
    }

    /// Fatal check that a block lies within the allocated extent.
    fn require_allocated(&self, block: &MemoryBlock) {
        let inside = block.len > 0
            && block
                .offset
                .checked_add(block.len)
                .is_some_and(|end| end <= self.watermark());
        if !inside {
            panic!("memory block out of arena bounds");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn rounds_and_advances_watermark() {
        let arena: Arena<64> = Arena::new();

        let a = arena.allocate(10).unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(a.len(), 16);
        assert_eq!(arena.watermark(), 16);

        assert!(arena.allocate(50).is_none());
        assert_eq!(arena.watermark(), 16, "failed call must not move the watermark");

        let b = arena.allocate(48).unwrap();
        assert_eq!(b.offset(), 16);
        assert_eq!(b.len(), 48);
        assert_eq!(arena.watermark(), 64);

        assert!(arena.allocate(1).is_none());
    }

    #[test]
    fn try_allocate_reports_exhaustion() {
        let arena: Arena<32> = Arena::new();
        assert!(arena.try_allocate(32).is_ok());
        assert_eq!(arena.try_allocate(1), Err(RtError::OutOfMemory));
    }

    #[test]
    fn zero_sized_request_is_refused() {
        let arena: Arena<64> = Arena::new();
        assert!(arena.allocate(0).is_none());
        assert_eq!(arena.watermark(), 0);
    }

    #[test]
    fn blocks_are_aligned_and_disjoint() {
        let arena: Arena<4096> = Arena::new();
        let mut rng = rand::thread_rng();
        let mut blocks = std::vec::Vec::new();

        while let Some(block) = arena.allocate(rng.gen_range(1..=96)) {
            blocks.push(block);
        }

        for block in &blocks {
            assert_eq!(block.offset() % MEM_ALIGNMENT, 0);
            assert!(block.offset() + block.len() <= arena.capacity());
        }

        blocks.sort_by_key(|b| b.offset());
        for pair in blocks.windows(2) {
            assert!(
                pair[0].offset() + pair[0].len() <= pair[1].offset(),
                "blocks overlap: {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn zeroed_allocation_reads_as_zero() {
        let arena: Arena<128> = Arena::new();
        let block = arena.allocate_zeroed(24).unwrap();
        assert!(arena.bytes(&block).iter().all(|&b| b == 0));
        assert_eq!(block.len(), 24);
    }

    #[test]
    fn store_and_load_round_trip() {
        let arena: Arena<64> = Arena::new();
        let block = arena.allocate(8).unwrap();
        arena.store_u64(&block, 0xDEAD_BEEF_0123_4567);
        assert_eq!(arena.load_u64(&block), 0xDEAD_BEEF_0123_4567);
    }

    #[test]
    #[should_panic(expected = "out of arena bounds")]
    fn forged_block_access_is_fatal() {
        let arena: Arena<64> = Arena::new();
        let _ = arena.allocate(8).unwrap();
        let forged = MemoryBlock::from_raw_parts(32, 16);
        let _ = arena.bytes(&forged);
    }

    #[test]
    fn contended_allocation_is_exclusive() {
        use std::sync::Arc;

        let arena = Arc::new(Arena::<1024>::new());
        let mut handles = std::vec::Vec::new();

        for _ in 0..2 {
            let arena = Arc::clone(&arena);
            handles.push(std::thread::spawn(move || arena.allocate(600)));
        }

        let outcomes: std::vec::Vec<_> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let won: std::vec::Vec<_> = outcomes.iter().flatten().collect();

        assert_eq!(won.len(), 1, "exactly one 600-byte claim can fit in 1024");
        assert_eq!(won[0].offset(), 0);
        assert_eq!(arena.watermark(), 600usize.next_multiple_of(MEM_ALIGNMENT));
    }

    #[test]
    fn hammered_watermark_stays_consistent() {
        use std::sync::Arc;

        let arena = Arc::new(Arena::<4096>::new());
        let mut handles = std::vec::Vec::new();

        for _ in 0..4 {
            let arena = Arc::clone(&arena);
            handles.push(std::thread::spawn(move || {
                let mut mine = std::vec::Vec::new();
                while let Some(block) = arena.allocate(24) {
                    mine.push(block);
                }
                mine
            }));
        }

        let mut all: std::vec::Vec<MemoryBlock> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_by_key(|b| b.offset());

        assert_eq!(all.len(), 4096 / 24usize.next_multiple_of(MEM_ALIGNMENT));
        for pair in all.windows(2) {
            assert_eq!(pair[0].offset() + pair[0].len(), pair[1].offset());
        }
    }
}

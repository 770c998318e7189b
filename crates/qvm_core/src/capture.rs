//! State-capture protocol for the debug/capture peripheral.
//!
//! Orchestrates the request/poll/read handshake that extracts a 64-bit
//! state word from the port into arena-backed memory, and the fire-and-
//! forget probe pulse. One `StateCapture` owns the port for the duration of
//! each call; the peripheral supports a single session, and the protocol
//! provides no locking of its own, so session exclusivity is the caller's
//! responsibility.

use qvm_common::debug_port::{
    CMD_QUBIT_PROBE, CMD_STATE_CAPTURE, OPERAND_SHIFT, PROBE_DELAY_ITERS, READY_BIT,
};

use crate::arena::{Arena, MemoryBlock};
use crate::memcheck;
use crate::port::{DebugPort, spin_delay};
use crate::RtError;

/// Size of one captured state word in the arena.
const CAPTURE_RESULT_BYTES: usize = 8;

/// Drives capture and probe sequences against one debug port.
///
/// Borrows the arena that receives capture results and the port being
/// driven. The poll step spins with no yield point and consumes the calling
/// context until the peripheral reports ready, so captures must not run in
/// a context where blocking is forbidden — in particular never from inside
/// an interrupt handler that must stay short, and never from within the
/// allocator's own retry loop.
pub struct StateCapture<'a, P: DebugPort, const N: usize> {
    arena: &'a Arena<N>,
    port: &'a P,
}

impl<'a, P: DebugPort, const N: usize> StateCapture<'a, P, N> {
    /// Binds a capture session to an arena and a port.
    pub fn new(arena: &'a Arena<N>, port: &'a P) -> Self {
        Self { arena, port }
    }

    /// Captures the selected state into a fresh arena block.
    ///
    /// Allocates eight bytes, validates the block strictly, writes the
    /// capture command with `selector` in the operand field, fences so the
    /// command is visible to the peripheral before polling begins, then
    /// busy-waits until the status word's ready bit rises. The 64-bit
    /// result is assembled as `(high << 32) | low`, stored little-endian
    /// into the block, and the block is returned.
    ///
    /// The poll is unbounded: the peripheral is trusted to always respond,
    /// and the reference behavior waits forever if it does not. Use
    /// [`StateCapture::capture_bounded`] to opt into a poll limit.
    ///
    /// # Panics
    ///
    /// Panics when the arena is exhausted (there is no fallback memory
    /// source for capture results) or when the fresh block fails strict
    /// validation (a corrupted watermark).
    pub fn capture(&self, selector: u16) -> MemoryBlock {
        let block = self.claim_result_block();

        self.request_capture(selector);
        loop {
            if self.port.read_ctrl() & READY_BIT != 0 {
                break;
            }
            core::hint::spin_loop();
        }

        self.finish_capture(block)
    }

    /// Captures like [`StateCapture::capture`], but gives up after
    /// `max_polls` not-ready observations.
    ///
    /// An explicit hardening deviation from the unbounded default, for
    /// integrations that cannot trust the peripheral to respond. On
    /// timeout the command has been issued but the result block is
    /// abandoned (the arena never reclaims it) and
    /// [`RtError::CaptureTimeout`] is returned.
    ///
    /// # Panics
    ///
    /// Same fatal allocation and validation failures as
    /// [`StateCapture::capture`].
    pub fn capture_bounded(&self, selector: u16, max_polls: u32) -> Result<MemoryBlock, RtError> {
        let block = self.claim_result_block();

        self.request_capture(selector);
        let mut polls = 0;
        loop {
            if self.port.read_ctrl() & READY_BIT != 0 {
                break;
            }
            polls += 1;
            if polls >= max_polls {
                return Err(RtError::CaptureTimeout);
            }
            core::hint::spin_loop();
        }

        Ok(self.finish_capture(block))
    }

    /// Fires a probe pulse at one qubit and paces out its settle time.
    ///
    /// Fire-and-forget: writes the probe command with the qubit id in the
    /// operand field, issues the instruction-synchronization fence so the
    /// write reaches the pipeline before the delay starts, then spins for
    /// the fixed pacing interval. No status is polled and nothing is
    /// allocated.
    pub fn probe(&self, id: u8) {
        self.port
            .write_ctrl(CMD_QUBIT_PROBE | u32::from(id) << OPERAND_SHIFT);
        self.port.fence_i();
        spin_delay(PROBE_DELAY_ITERS);
    }

    fn claim_result_block(&self) -> MemoryBlock {
        let Some(block) = self.arena.allocate(CAPTURE_RESULT_BYTES) else {
            panic!("state capture: arena exhausted");
        };
        memcheck::require_arena_backed(self.arena, &block);
        block
    }

    fn request_capture(&self, selector: u16) {
        self.port
            .write_ctrl(CMD_STATE_CAPTURE | u32::from(selector) << OPERAND_SHIFT);
        self.port.fence();
    }

    fn finish_capture(&self, block: MemoryBlock) -> MemoryBlock {
        let high = self.port.read_data_high();
        let low = self.port.read_data_low();
        let value = (u64::from(high) << 32) | u64::from(low);

        self.arena.store_u64(&block, value);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        WriteCtrl(u32),
        ReadCtrl,
        ReadHigh,
        ReadLow,
        Fence,
        FenceI,
    }

    /// Scripted port: raises the ready bit after a fixed number of polls.
    struct ScriptedPort {
        high: u32,
        low: u32,
        ready_after: u32,
        polls: Cell<u32>,
        log: RefCell<Vec<Event>>,
    }

    impl ScriptedPort {
        fn new(high: u32, low: u32, ready_after: u32) -> Self {
            Self {
                high,
                low,
                ready_after,
                polls: Cell::new(0),
                log: RefCell::new(Vec::new()),
            }
        }

        fn log(&self) -> Vec<Event> {
            self.log.borrow().clone()
        }
    }

    impl DebugPort for ScriptedPort {
        fn write_ctrl(&self, value: u32) {
            self.log.borrow_mut().push(Event::WriteCtrl(value));
            self.polls.set(0);
        }

        fn read_ctrl(&self) -> u32 {
            self.log.borrow_mut().push(Event::ReadCtrl);
            let seen = self.polls.get();
            self.polls.set(seen + 1);
            if seen >= self.ready_after {
                READY_BIT
            } else {
                0
            }
        }

        fn read_data_high(&self) -> u32 {
            self.log.borrow_mut().push(Event::ReadHigh);
            self.high
        }

        fn read_data_low(&self) -> u32 {
            self.log.borrow_mut().push(Event::ReadLow);
            self.low
        }

        fn fence(&self) {
            self.log.borrow_mut().push(Event::Fence);
        }

        fn fence_i(&self) {
            self.log.borrow_mut().push(Event::FenceI);
        }
    }

    #[test]
    fn capture_assembles_high_and_low_halves() {
        let arena: Arena<64> = Arena::new();
        let port = ScriptedPort::new(0xAABB_CCDD, 0x1122_3344, 0);
        let capture = StateCapture::new(&arena, &port);

        let block = capture.capture(0);
        assert_eq!(arena.load_u64(&block), 0xAABB_CCDD_1122_3344);
    }

    #[test]
    fn capture_sequences_request_fence_poll_read() {
        let arena: Arena<64> = Arena::new();
        let port = ScriptedPort::new(1, 2, 3);
        let capture = StateCapture::new(&arena, &port);

        let _ = capture.capture(0x3);

        let expected_cmd = CMD_STATE_CAPTURE | 0x3 << OPERAND_SHIFT;
        assert_eq!(
            port.log(),
            std::vec![
                Event::WriteCtrl(expected_cmd),
                Event::Fence,
                Event::ReadCtrl,
                Event::ReadCtrl,
                Event::ReadCtrl,
                Event::ReadCtrl,
                Event::ReadHigh,
                Event::ReadLow,
            ]
        );
    }

    #[test]
    fn capture_result_lands_in_a_fresh_valid_block() {
        let arena: Arena<64> = Arena::new();
        let port = ScriptedPort::new(0, 7, 0);
        let capture = StateCapture::new(&arena, &port);

        let first = capture.capture(0);
        let second = capture.capture(1);

        assert_eq!(first.len(), 8);
        assert_eq!(second.offset(), first.offset() + first.len());
        assert_eq!(arena.load_u64(&second), 7);
    }

    #[test]
    fn bounded_capture_times_out_on_silent_port() {
        let arena: Arena<64> = Arena::new();
        let port = ScriptedPort::new(0, 0, u32::MAX);
        let capture = StateCapture::new(&arena, &port);

        assert_eq!(
            capture.capture_bounded(0, 16),
            Err(RtError::CaptureTimeout)
        );
    }

    #[test]
    fn bounded_capture_succeeds_within_budget() {
        let arena: Arena<64> = Arena::new();
        let port = ScriptedPort::new(0xAABB_CCDD, 0x1122_3344, 4);
        let capture = StateCapture::new(&arena, &port);

        let block = capture.capture_bounded(0, 16).unwrap();
        assert_eq!(arena.load_u64(&block), 0xAABB_CCDD_1122_3344);
    }

    #[test]
    fn probe_fires_without_polling_or_allocating() {
        let arena: Arena<64> = Arena::new();
        let port = ScriptedPort::new(0, 0, 0);
        let capture = StateCapture::new(&arena, &port);

        capture.probe(7);

        let expected_cmd = CMD_QUBIT_PROBE | 7 << OPERAND_SHIFT;
        assert_eq!(
            port.log(),
            std::vec![Event::WriteCtrl(expected_cmd), Event::FenceI]
        );
        assert_eq!(arena.watermark(), 0);
    }

    #[test]
    #[should_panic(expected = "arena exhausted")]
    fn capture_without_capacity_is_fatal() {
        let arena: Arena<8> = Arena::new();
        let port = ScriptedPort::new(0, 0, 0);
        let capture = StateCapture::new(&arena, &port);

        let _ = capture.capture(0);
        let _ = capture.capture(0);
    }
}

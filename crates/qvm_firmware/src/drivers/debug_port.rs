//! MMIO driver for the JTAG-style debug/capture port.
//!
//! Implements the core port trait over the fixed register window at
//! `DEBUG_PORT_BASE`. Every register access is volatile so the compiler
//! can neither cache a stale status word nor coalesce the poll loop's
//! repeated reads, and the two fences map onto the RISC-V `fence` and
//! `fence.i` instructions the protocol's ordering contract names.
//!
//! The window must be mapped to the capture peripheral; the protocol
//! assumes one exclusive session, which firmware guarantees by driving
//! the port from hart 0 only.

use qvm_common::debug_port::{REG_CTRL, REG_DATA_HIGH, REG_DATA_LOW};
use qvm_common::mmio::DEBUG_PORT_BASE;
use qvm_core::port::DebugPort;

/// Register-window handle for the capture peripheral.
pub struct MmioDebugPort;

fn reg(word_offset: usize) -> *mut u32 {
    (DEBUG_PORT_BASE as *mut u32).wrapping_add(word_offset)
}

impl DebugPort for MmioDebugPort {
    fn write_ctrl(&self, value: u32) {
        unsafe { reg(REG_CTRL).write_volatile(value) }
    }

    fn read_ctrl(&self) -> u32 {
        unsafe { reg(REG_CTRL).read_volatile() }
    }

    fn read_data_high(&self) -> u32 {
        unsafe { reg(REG_DATA_HIGH).read_volatile() }
    }

    fn read_data_low(&self) -> u32 {
        unsafe { reg(REG_DATA_LOW).read_volatile() }
    }

    fn fence(&self) {
        unsafe { core::arch::asm!("fence") }
    }

    fn fence_i(&self) {
        unsafe { core::arch::asm!("fence.i") }
    }
}

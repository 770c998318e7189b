//! RISC-V trap and timer-tick handling.
//!
//! Machine-mode timer interrupts from the CLINT drive the firmware's
//! periodic tick: each interrupt bumps the global tick counter and
//! reschedules the compare register one interval ahead. The capture loop
//! reads the counter for its status line timestamps.

use core::sync::atomic::Ordering;

use qvm_common::mmio::{MTIME_ADDR, MTIMECMP_ADDR};
use riscv::register::{mie, mstatus};

/// Machine timer ticks between interrupts (one second at QEMU's 10 MHz).
const TICK_INTERVAL: u64 = 10_000_000;

/// mcause value for a machine timer interrupt on RV64.
const MCAUSE_MACHINE_TIMER: usize = 0x8000_0000_0000_0007;

/// Arms the periodic timer tick for the calling hart.
///
/// Schedules the first compare interrupt one interval out, then enables
/// machine timer interrupts globally. Must run before the capture loop
/// starts relying on tick timestamps.
pub fn enable_timer_tick() {
    unsafe {
        let now = (MTIME_ADDR as *const u64).read_volatile();
        (MTIMECMP_ADDR as *mut u64).write_volatile(now + TICK_INTERVAL);

        mie::set_mtimer();
        mstatus::set_mie();
    }
}

/// Trap handler called from the assembly trap vector.
///
/// Handles timer interrupts by advancing the tick counter and scheduling
/// the next interrupt. Other trap causes are ignored. Runs with interrupts
/// disabled; it must stay short and must never allocate or capture.
#[unsafe(no_mangle)]
pub extern "C" fn rust_trap_handler() {
    let cause = riscv::register::mcause::read();

    if cause.bits() == MCAUSE_MACHINE_TIMER {
        crate::TICKS.fetch_add(1, Ordering::Relaxed);
        unsafe {
            let now = (MTIME_ADDR as *const u64).read_volatile();
            (MTIMECMP_ADDR as *mut u64).write_volatile(now + TICK_INTERVAL);
        }
    }
}

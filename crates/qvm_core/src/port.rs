//! Register-level interface to the debug/capture peripheral.
//!
//! The peripheral is a fixed register file: a combined control/status word
//! and two data registers holding the halves of the captured 64-bit state
//! (layout and encodings in `qvm_common::debug_port`). Implementations back
//! the trait with volatile MMIO accesses on hardware and with plain atomics
//! in the host simulation; either way, repeated status reads must observe
//! the register afresh each time, because the capture protocol polls for a
//! changing value.

/// Register access and ordering primitives for one debug-port session.
///
/// All operations are atomic at the hardware level. The two fences are
/// deliberately separate, explicitly callable operations rather than being
/// baked into the register accessors: the capture protocol states exactly
/// where ordering is required, and the implementations supply whatever the
/// execution environment uses to order volatile hardware accesses.
pub trait DebugPort {
    /// Writes a command word to the control/status register.
    fn write_ctrl(&self, value: u32);

    /// Reads the control/status register.
    ///
    /// Must perform a real access on every call; the poll loop depends on
    /// observing the ready bit appear across repeated reads.
    fn read_ctrl(&self) -> u32;

    /// Reads the high half of the captured state.
    fn read_data_high(&self) -> u32;

    /// Reads the low half of the captured state.
    fn read_data_low(&self) -> u32;

    /// Full memory fence.
    ///
    /// Orders all prior memory operations, including writes to this port,
    /// before any subsequent operation.
    fn fence(&self);

    /// Instruction-synchronization fence.
    ///
    /// Flushes pending instruction-stream effects before subsequent
    /// instructions execute; the probe pulse's timing must not be hoisted
    /// or reordered by the core pipeline.
    fn fence_i(&self);
}

/// Busy-waits for a fixed number of iterations of real work.
///
/// A pacing delay, not a polled condition: the probe pulse needs wall-clock
/// settle time and the peripheral never signals completion. The counter is
/// accessed through volatile reads and writes so the optimizer can neither
/// eliminate the loop nor collapse its iteration count, at any optimization
/// level.
pub fn spin_delay(iterations: u32) {
    let mut spins: u32 = 0;
    while unsafe { core::ptr::read_volatile(&spins) } < iterations {
        let next = spins.wrapping_add(1);
        unsafe { core::ptr::write_volatile(&mut spins, next) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_delay_terminates() {
        spin_delay(0);
        spin_delay(1);
        spin_delay(10_000);
    }
}

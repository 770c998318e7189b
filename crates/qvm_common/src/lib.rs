//! Common definitions and constants shared across the quantum VM runtime.
//!
//! This module provides memory-mapped I/O addresses for hardware peripherals,
//! the debug-port register protocol encodings, and the memory subsystem
//! configuration used by firmware, host tools, and the hardware simulation.

#![no_std]

// Memory-mapped I/O address space definitions for the target platform.
//
// Defines the physical address layout for peripherals including the
// interrupt controller, the JTAG-style debug/capture port, and memory
// regions. These addresses must match the platform memory map and are used
// by both firmware drivers and host-side documentation of the layout.
pub mod mmio {
    /// Base address of the CLINT (Core Local Interruptor) in QEMU 'virt' machine.
    ///
    /// The CLINT provides per-hart machine-mode timer interrupts and software
    /// interrupt generation. This address is standard for QEMU's RISC-V virt
    /// platform and must match the device tree configuration.
    pub const CLINT_BASE: usize = 0x200_0000;

    /// Memory-mapped address for the machine timer compare register.
    ///
    /// When the machine timer (MTIME) reaches this value, a timer interrupt
    /// is generated. Writing to this register schedules the next interrupt.
    /// Offset from CLINT_BASE is 0x4000 for hart 0, with 8-byte increments
    /// per additional hart.
    pub const MTIMECMP_ADDR: usize = CLINT_BASE + 0x4000;

    /// Memory-mapped address for the machine timer counter register.
    ///
    /// This 64-bit read-only register increments at a fixed frequency
    /// (typically 10 MHz in QEMU). Used for pacing the firmware capture loop
    /// and timestamping status reports.
    pub const MTIME_ADDR: usize = CLINT_BASE + 0xBFF8;

    /// Memory-mapped address of the UART transmit register.
    ///
    /// Standard address for the UART on QEMU's RISC-V virt platform. Writing
    /// a byte to this address transmits it over the serial console.
    pub const UART0_BASE: usize = 0x1000_0000;

    /// Base address of the JTAG-style debug/capture port.
    ///
    /// Memory-mapped window exposing the capture peripheral's register file:
    /// a control/status word followed by two 32-bit data registers. The port
    /// occupies the device MMIO window below RAM; the UART owns 0x1000_0000
    /// on this platform, so the capture port sits in the accelerator window.
    pub const DEBUG_PORT_BASE: usize = 0x4000_0000;

    /// Base address of the platform GPIO block.
    ///
    /// Used by the firmware heartbeat to drive a pin while the capture loop
    /// is alive. Only the output-value register is touched.
    pub const GPIO_BASE: usize = 0x1006_0000;

    /// Base address of high RAM region.
    ///
    /// Start of the main system memory region where firmware code, data
    /// structures, and the capture arena reside. This address is standard
    /// for QEMU virt machine and marks the transition from device memory
    /// space to general-purpose RAM.
    pub const RAM_BASE: usize = 0x8000_0000;
}

/// Register layout and command encodings for the debug/capture port.
///
/// The port exposes three 32-bit registers: a combined control/status word
/// at word offset 0, and the high and low halves of the captured 64-bit
/// state at word offsets 1 and 2. Commands are written to the control word
/// with their operand packed into the upper bits; completion is signalled
/// by the peripheral setting the top bit of the status word.
pub mod debug_port {
    /// Word offset of the combined control/status register.
    pub const REG_CTRL: usize = 0;

    /// Word offset of the captured-state high half.
    pub const REG_DATA_HIGH: usize = 1;

    /// Word offset of the captured-state low half.
    pub const REG_DATA_LOW: usize = 2;

    /// Command code requesting a full state capture.
    ///
    /// The peripheral latches the selector from the operand field, samples
    /// the requested state, loads the data registers, and raises
    /// [`READY_BIT`] in the status word when both halves are valid.
    pub const CMD_STATE_CAPTURE: u32 = 0x1;

    /// Command code firing a single-qubit probe pulse.
    ///
    /// Fire-and-forget: the peripheral emits the pulse for the qubit id in
    /// the operand field and never signals completion. Callers pace
    /// themselves with a fixed delay instead of polling.
    pub const CMD_QUBIT_PROBE: u32 = 0x2;

    /// Bit position of the command operand within the control word.
    ///
    /// Bits [7:0] carry the command code; bits [31:8] carry the operand
    /// (capture selector or probe qubit id).
    pub const OPERAND_SHIFT: u32 = 8;

    /// Status-word bit the peripheral raises when capture data is ready.
    pub const READY_BIT: u32 = 1 << 31;

    /// Iteration count of the pacing delay after a probe pulse.
    ///
    /// The probe command has no completion signal; the pulse is guaranteed
    /// to have settled after this many spins of the non-elidable delay loop.
    pub const PROBE_DELAY_ITERS: u32 = 100;
}

/// Memory subsystem configuration.
///
/// Changing either constant changes allocation outcomes but not the
/// algorithm: the arena always hands out aligned, monotonically increasing
/// ranges until the capacity is exhausted.
pub mod mem {
    /// Capacity of the runtime capture arena in bytes.
    pub const ARENA_SIZE: usize = 256 * 1024;

    /// Alignment boundary for every arena allocation, in bytes.
    ///
    /// Every allocation size is rounded up to a multiple of this value, so
    /// every block offset is also a multiple of it. Must be at least the
    /// natural alignment of any value stored in the arena; the 64-bit
    /// capture result requires 8.
    pub const MEM_ALIGNMENT: usize = 8;
}

//! Simulated debug/capture peripheral for host-side testing.
//!
//! Provides a pure-Rust model of the JTAG-style capture port so the
//! protocol stack can be exercised without a target. The simulation honors
//! the register-level contract the firmware driver relies on: commands are
//! latched from the control word, the ready bit rises only after a
//! configurable number of status polls, and the data registers expose the
//! two halves of a 64-bit state word.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering, compiler_fence, fence};

use qvm_common::debug_port::{CMD_QUBIT_PROBE, CMD_STATE_CAPTURE, OPERAND_SHIFT, READY_BIT};
use qvm_core::port::DebugPort;

/// Poll latency value meaning the peripheral never reports ready.
///
/// Used to exercise the bounded-capture timeout path; an unbounded capture
/// against a port configured this way spins forever, exactly like real
/// hardware that has wedged.
pub const NEVER_READY: u32 = u32::MAX;

/// Sentinel for "no probe pulse observed yet".
const NO_PROBE: u32 = u32::MAX;

/// In-memory model of the debug/capture port register file.
///
/// One instance models one exclusive session, mirroring the hardware
/// assumption. Registers are plain atomics: the simulation does not need
/// volatile access, it needs the same observable behavior — every status
/// read is a fresh observation, and the ready bit appears only across
/// repeated polls.
pub struct SimDebugPort {
    /// Last value written to the control word.
    ctrl: AtomicU32,

    /// The 64-bit state the next capture will return.
    state: AtomicU64,

    /// Status polls to absorb before raising the ready bit.
    latency: u32,

    /// Not-ready polls remaining for the in-flight capture.
    pending: AtomicU32,

    /// Capture commands observed since construction.
    captures: AtomicU32,

    /// Probe commands observed since construction.
    probes: AtomicU32,

    /// Operand of the most recent capture command.
    last_selector: AtomicU32,

    /// Operand of the most recent probe command.
    last_probe: AtomicU32,
}

impl SimDebugPort {
    /// Models a responsive peripheral.
    ///
    /// `state` is the 64-bit word the data registers will expose;
    /// `latency` is the number of not-ready status polls before the ready
    /// bit rises (0 means ready on the first poll). Pass [`NEVER_READY`]
    /// to model a wedged peripheral.
    pub fn new(state: u64, latency: u32) -> Self {
        Self {
            ctrl: AtomicU32::new(0),
            state: AtomicU64::new(state),
            latency,
            pending: AtomicU32::new(0),
            captures: AtomicU32::new(0),
            probes: AtomicU32::new(0),
            last_selector: AtomicU32::new(0),
            last_probe: AtomicU32::new(NO_PROBE),
        }
    }

    /// Models a peripheral that never completes a capture.
    pub fn silent() -> Self {
        Self::new(0, NEVER_READY)
    }

    /// Replaces the state word the next capture will return.
    pub fn set_state(&self, state: u64) {
        self.state.store(state, Ordering::SeqCst);
    }

    /// Number of capture commands the port has latched.
    pub fn capture_requests(&self) -> u32 {
        self.captures.load(Ordering::SeqCst)
    }

    /// Number of probe pulses the port has latched.
    pub fn probe_pulses(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    /// Selector operand of the most recent capture command.
    pub fn last_selector(&self) -> u16 {
        self.last_selector.load(Ordering::SeqCst) as u16
    }

    /// Qubit id of the most recent probe pulse, if any fired.
    pub fn last_probe(&self) -> Option<u8> {
        match self.last_probe.load(Ordering::SeqCst) {
            NO_PROBE => None,
            id => Some(id as u8),
        }
    }
}

impl DebugPort for SimDebugPort {
    /// Latches a command, starting a new handshake.
    ///
    /// A capture command arms the poll countdown; a probe command is only
    /// counted, since the hardware never acknowledges probes.
    fn write_ctrl(&self, value: u32) {
        self.ctrl.store(value, Ordering::SeqCst);
        match value & ((1 << OPERAND_SHIFT) - 1) {
            CMD_STATE_CAPTURE => {
                self.pending.store(self.latency, Ordering::SeqCst);
                self.last_selector
                    .store(value >> OPERAND_SHIFT, Ordering::SeqCst);
                self.captures.fetch_add(1, Ordering::SeqCst);
            }
            CMD_QUBIT_PROBE => {
                self.last_probe
                    .store(value >> OPERAND_SHIFT & 0xFF, Ordering::SeqCst);
                self.probes.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }

    /// Reports the control word, raising the ready bit once the
    /// configured poll latency has been absorbed.
    fn read_ctrl(&self) -> u32 {
        let ctrl = self.ctrl.load(Ordering::SeqCst);
        if self.latency == NEVER_READY {
            return ctrl & !READY_BIT;
        }

        let remaining = self.pending.load(Ordering::SeqCst);
        if remaining > 0 {
            self.pending.store(remaining - 1, Ordering::SeqCst);
            ctrl & !READY_BIT
        } else {
            ctrl | READY_BIT
        }
    }

    fn read_data_high(&self) -> u32 {
        (self.state.load(Ordering::SeqCst) >> 32) as u32
    }

    fn read_data_low(&self) -> u32 {
        self.state.load(Ordering::SeqCst) as u32
    }

    /// Full fence, host edition.
    fn fence(&self) {
        fence(Ordering::SeqCst);
    }

    /// Instruction-sync fence, host edition: the simulation has no
    /// pipeline to flush, so ordering the compiler suffices.
    fn fence_i(&self) {
        compiler_fence(Ordering::SeqCst);
    }
}

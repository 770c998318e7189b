//! Core runtime primitives for the quantum VM's embedded image.
//!
//! This crate provides the two runtime pieces with real invariants: the
//! fixed-capacity arena that backs all capture-time allocation, and the
//! register handshake protocol that extracts state snapshots from the
//! JTAG-style debug port. All modules are `no_std` and usable both in
//! firmware and in host-side simulation and tests.

#![no_std]

#[cfg(test)]
extern crate std;

/// Lock-free bump arena and the memory blocks it hands out.
///
/// Allocation only ever moves a watermark forward; nothing is freed or
/// reused for the arena's lifetime. This is the deliberate embedded
/// tradeoff of determinism over utilization, and every other module builds
/// on the disjointness guarantee it provides.
pub mod arena;

/// State-capture protocol against the debug port.
///
/// The request/fence/poll/read sequence that assembles a 64-bit state word
/// into arena-backed memory, plus the fire-and-forget probe pulse with its
/// fixed pacing delay.
pub mod capture;

/// Block validation policies.
///
/// A lenient shape check for blocks of unknown provenance and a strict,
/// fatal arena-extent check for blocks about to reach hardware-adjacent
/// code. Independently selectable; the capture path uses the strict one.
pub mod memcheck;

/// Debug-port register interface and ordering primitives.
///
/// The trait hardware drivers and the host simulation implement, and the
/// non-elidable spin delay used to pace probe pulses.
pub mod port;

/// Error values returned by runtime operations.
///
/// Only recoverable conditions appear here; invariant violations (blocks
/// outside the arena, misalignment) terminate the process at the point of
/// detection instead of propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtError {
    /// An allocation request could not be satisfied.
    ///
    /// The arena has exhausted its capacity or the requested size exceeds
    /// what remains. Callers decide whether to skip the operation or halt;
    /// the arena itself treats this as an ordinary outcome.
    OutOfMemory,

    /// A bounded capture gave up before the peripheral reported ready.
    ///
    /// Only produced by the explicitly configured bounded poll variant;
    /// the default capture path waits forever by design.
    CaptureTimeout,
}

//! I/O utilities for driving debug-capture sessions from the host.
//!
//! Provides the session plan format — a line-oriented script of capture,
//! probe, and expectation steps executed against the (simulated or real)
//! debug port — and helpers for expanding packed qubit masks into the
//! individual probe pulses they stand for.

/// Qubit-mask expansion.
///
/// A session plan can name a whole set of qubits as a packed bitmask;
/// the hardware probe command addresses one qubit at a time, so the mask
/// is expanded into an ordered list of qubit ids before execution.
pub mod mask;

/// Parser for session plan files.
///
/// Parses the line-oriented plan grammar into [`plan::PlanStep`] values.
/// Blank lines and `#` comments are skipped; anything else must be a
/// well-formed step, and malformed lines fail the whole load with the
/// offending line number.
pub mod plan;

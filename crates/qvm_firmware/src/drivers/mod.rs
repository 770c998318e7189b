//! Hardware driver modules for firmware peripherals.
//!
//! Contains the MMIO drivers for the debug/capture port and the GPIO
//! heartbeat pin. Each driver provides a safe interface to its hardware
//! component; addresses come from the shared platform memory map.

pub mod debug_port;
pub mod gpio;

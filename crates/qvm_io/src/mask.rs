//! Packed qubit-mask expansion.

use bitvec::prelude::*;

/// Expands a packed qubit mask into the qubit ids it selects.
///
/// Bit 0 selects qubit 0; ids come back lowest-first, which is the order
/// the probe pulses fire in. An all-zero mask selects nothing.
pub fn expand_mask(mask: u64) -> Vec<u8> {
    mask.view_bits::<Lsb0>()
        .iter_ones()
        .map(|idx| idx as u8)
        .collect()
}

//! Fixed-iteration capture benchmark.
//!
//! Runs the full capture handshake against the simulated port for a fixed
//! number of iterations and reports the latency distribution. The
//! iteration count is bounded by the arena: every capture permanently
//! claims eight bytes, so a run can never exceed the arena capacity.

use anyhow::{Result, ensure};
use qvm_common::mem::ARENA_SIZE;
use qvm_core::arena::Arena;
use qvm_core::capture::StateCapture;
use qvm_sim::SimDebugPort;
use std::time::Instant;

use crate::stats::LatencyStats;

/// Bytes one capture claims from the arena.
const BYTES_PER_CAPTURE: usize = 8;

pub fn run_benchmark(iterations: usize, latency: u32) -> Result<()> {
    ensure!(
        iterations * BYTES_PER_CAPTURE <= ARENA_SIZE,
        "{iterations} captures need {} B but the arena holds {} B",
        iterations * BYTES_PER_CAPTURE,
        ARENA_SIZE
    );

    let arena = Box::new(Arena::<ARENA_SIZE>::new());
    let port = SimDebugPort::new(0, latency);
    let capture = StateCapture::new(&arena, &port);

    let mut stats = LatencyStats::new();
    let started = Instant::now();

    for i in 0..iterations {
        port.set_state((i as u64) << 32 | i as u64);
        let t0 = Instant::now();
        let block = capture.capture((i & 0xFFFF) as u16);
        stats.update(t0.elapsed().as_nanos() as u64);

        debug_assert_eq!(arena.load_u64(&block), (i as u64) << 32 | i as u64);
    }

    let elapsed = started.elapsed();
    println!("Ran {iterations} captures in {:.2} ms", elapsed.as_secs_f64() * 1000.0);
    println!(
        "Arena: {} / {} B used",
        arena.watermark(),
        arena.capacity()
    );
    stats.print_report();
    Ok(())
}

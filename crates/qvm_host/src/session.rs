//! Session plan execution against the simulated debug port.
//!
//! Walks the parsed plan step by step, driving the capture protocol the
//! same way the firmware does, and reports every capture and probe on
//! stdout. Expectation steps turn the run into a self-checking session:
//! the first mismatch aborts with the captured and expected values.

use anyhow::{Result, bail};
use qvm_common::mem::ARENA_SIZE;
use qvm_core::arena::Arena;
use qvm_core::capture::StateCapture;
use qvm_io::mask::expand_mask;
use qvm_io::plan::PlanStep;
use qvm_sim::SimDebugPort;

pub fn run_plan(steps: &[PlanStep], state: u64, latency: u32) -> Result<()> {
    let arena = Box::new(Arena::<ARENA_SIZE>::new());
    let port = SimDebugPort::new(state, latency);
    let capture = StateCapture::new(&arena, &port);

    let mut last_capture: Option<u64> = None;

    for step in steps {
        match *step {
            PlanStep::Capture { selector } => {
                let block = capture.capture(selector);
                let value = arena.load_u64(&block);
                println!(
                    "[CAPTURE] selector 0x{selector:04X} -> 0x{value:016X} (offset {})",
                    block.offset()
                );
                last_capture = Some(value);
            }
            PlanStep::Probe { id } => {
                capture.probe(id);
                println!("[PROBE]   qubit {id}");
            }
            PlanStep::ProbeMask { mask } => {
                let ids = expand_mask(mask);
                for &id in &ids {
                    capture.probe(id);
                }
                println!("[PROBE]   mask 0x{mask:X} -> {} pulses", ids.len());
            }
            PlanStep::Expect { value } => match last_capture {
                Some(captured) if captured == value => println!("[CHECK]   0x{value:016X} ok"),
                Some(captured) => {
                    bail!("expected 0x{value:016X}, captured 0x{captured:016X}")
                }
                None => bail!("expect step before any capture"),
            },
        }
    }

    println!(
        "[DONE]    {} captures, {} probes, {} arena bytes used",
        port.capture_requests(),
        port.probe_pulses(),
        arena.watermark()
    );
    Ok(())
}

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU64, Ordering};

use qvm_common::mem::ARENA_SIZE;
use qvm_common::mmio::MTIME_ADDR;
use qvm_core::arena::Arena;
use qvm_core::capture::StateCapture;

mod console;
mod drivers;
mod trap;

use drivers::debug_port::MmioDebugPort;
use drivers::gpio;

/// Backing arena for every capture result the image ever stores.
///
/// Statically placed, but always handed around by reference; nothing else
/// in the image reaches into it directly.
static ARENA: Arena<ARENA_SIZE> = Arena::new();

/// Seconds since boot, advanced by the timer trap.
pub static TICKS: AtomicU64 = AtomicU64::new(0);

/// GPIO pin flipped on every capture.
const HEARTBEAT_PIN: u8 = 17;

/// Machine timer ticks between captures (one second at QEMU's 10 MHz).
const CAPTURE_INTERVAL: u64 = 10_000_000;

use core::arch::global_asm;
global_asm!(include_str!("entry.S"));

#[unsafe(no_mangle)]
pub extern "C" fn kmain() -> ! {
    let hartid: usize;
    unsafe {
        core::arch::asm!("csrr {}, mhartid", out(reg) hartid);
    }

    // Single debug session: only hart 0 drives the port.
    if hartid != 0 {
        park();
    }

    primary_main()
}

fn primary_main() -> ! {
    console::init();
    console::println!("[BOOT] capture runtime online");
    console::println!(
        "[BOOT] arena {} B, {} B free",
        ARENA.capacity(),
        ARENA.remaining()
    );

    trap::enable_timer_tick();

    let port = MmioDebugPort;
    let capture = StateCapture::new(&ARENA, &port);

    let mut selector: u16 = 0;
    let mut heartbeat = false;
    let mut next_capture = read_mtime();

    loop {
        let now = read_mtime();
        if now < next_capture {
            core::hint::spin_loop();
            continue;
        }
        next_capture += CAPTURE_INTERVAL;

        // Exhaustion is an ordinary outcome: stop capturing, halt cleanly.
        if ARENA.remaining() < 8 {
            console::println!("[HALT] arena full after {} B", ARENA.watermark());
            break;
        }

        let block = capture.capture(selector);
        let value = ARENA.load_u64(&block);
        console::println!(
            "[CAPTURE] t={}s sel={:#06X} -> {:#018X} (offset {})",
            TICKS.load(Ordering::Relaxed),
            selector,
            value,
            block.offset()
        );

        capture.probe((selector & 0x3F) as u8);

        heartbeat = !heartbeat;
        gpio::drive(HEARTBEAT_PIN, heartbeat);

        selector = selector.wrapping_add(1);
    }

    park()
}

fn park() -> ! {
    loop {
        unsafe { riscv::asm::wfi() };
    }
}

fn read_mtime() -> u64 {
    unsafe { (MTIME_ADDR as *const u64).read_volatile() }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    console::println!("PANIC: {:?}", info);
    unsafe {
        let qemu_exit = 0x100000 as *mut u32;
        qemu_exit.write_volatile(0x5555);
    }
    loop {}
}

//! UART console for firmware diagnostic output.
//!
//! Writes to the QEMU virt UART through volatile stores. Only hart 0 runs
//! the capture loop and the trap handler never prints, so no locking is
//! needed around the device.

use core::fmt;

use qvm_common::mmio::UART0_BASE;

/// UART device interface for formatted output.
///
/// Implements `fmt::Write` so the `println!` macro can drive it. Newlines
/// are expanded to CRLF for serial terminal compatibility, and every byte
/// goes out through a volatile store the compiler cannot elide or reorder.
pub struct Uart;

impl fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let tx = UART0_BASE as *mut u8;
        for c in s.bytes() {
            unsafe {
                if c == b'\n' {
                    core::ptr::write_volatile(tx, b'\r');
                }
                core::ptr::write_volatile(tx, c);
            }
        }
        Ok(())
    }
}

/// Initializes the console subsystem.
///
/// A no-op on QEMU, where the UART needs no setup. Kept for hardware that
/// will want baud-rate configuration here.
pub fn init() {}

/// Internal sink for the `println!` macro; not for direct use.
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    let _ = Uart.write_fmt(args);
}

/// Prints a formatted line to the serial console.
#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => ({
        $crate::console::_print(format_args!($($arg)*));
        $crate::console::_print(format_args!("\n"));
    });
}
pub use println;

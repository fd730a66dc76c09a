use core::ops::Range;

use chainload::session::{ErrorPolicy, SessionConfig};

/// Where the bootloader itself is linked (see `layout.ld`).
pub const BOOTLOADER_START_ADDR: u64 = 0x400_0000;

/// Where the firmware would have put the kernel, and where we put it.
pub const BINARY_START_ADDR: u64 = 0x8_0000;

/// Addresses a transfer may write. Everything between the kernel's load
/// address and the bootloader.
pub const LOAD_WINDOW: Range<u64> = BINARY_START_ADDR..BOOTLOADER_START_ADDR;

/// Peripheral base as seen from the ARM cores on a BCM2837.
pub const IO_BASE: usize = 0x3f00_0000;

/// Mini UART baud register for 115200 baud off a 250 MHz core clock.
pub const MINI_UART_BAUD_DIVISOR: u32 = 270;

/// A line that goes bad is logged and skipped; sixteen of them in one
/// transfer mean the link is garbage and the transfer starts over.
pub const SESSION_CONFIG: SessionConfig = SessionConfig {
    policy: ErrorPolicy::Continue,
    max_errors: Some(16),
};

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]
#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Second-stage loader: receives a kernel as record lines on the mini UART,
//! writes it between `BINARY_START_ADDR` and the bootloader, and jumps to
//! the entry point the transfer announced.

#[cfg(target_os = "none")]
#[macro_use]
extern crate log;

#[cfg(target_os = "none")]
mod gpio;
#[cfg(target_os = "none")]
mod init;
#[cfg(target_os = "none")]
mod launch;
#[cfg(target_os = "none")]
mod logger;
#[cfg(target_os = "none")]
mod mmio;
#[cfg(target_os = "none")]
mod uart;

mod lines;
mod param;

#[cfg(target_os = "none")]
#[no_mangle]
pub extern "C" fn kmain() -> ! {
    use chainload::{MemoryWriter, Session};

    use lines::MarkerLines;
    use param::{LOAD_WINDOW, SESSION_CONFIG};
    use uart::MiniUart;

    let mut uart = MiniUart::initialize();
    unsafe { logger::init_logger() };

    info!(
        "waiting for image in {:#x}..{:#x}",
        LOAD_WINDOW.start, LOAD_WINDOW.end
    );

    loop {
        // Identity mapped: the MMU is still off.
        let writer = unsafe { MemoryWriter::identity(LOAD_WINDOW) };
        let mut session = Session::new(writer, SESSION_CONFIG);

        match session.run(&mut MarkerLines::new(&mut uart)) {
            Ok(launch) => {
                let stats = session.stats();
                info!(
                    "received {} bytes in {} lines, jumping to {:#x}",
                    stats.bytes_written, stats.lines, launch.entry
                );
                unsafe { launch::jump_to(&launch) }
            }
            Err(error) => error!("transfer failed: {}; waiting for a new image", error),
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("bootloader: build with --target aarch64-unknown-none to get a bootable image");
}

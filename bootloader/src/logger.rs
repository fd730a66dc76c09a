use core::fmt::Write;

use log::{LevelFilter, Metadata, Record};

use crate::uart::MiniUart;

struct UartLogger;

static LOGGER: UartLogger = UartLogger;

impl log::Log for UartLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(MiniUart::attach(), "[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// # Safety
///
/// Must run once, on the boot core, before anything logs.
pub unsafe fn init_logger() {
    let installed = log::set_logger_racy(&LOGGER).map(|()| {
        log::set_max_level(if option_env!("VERBOSE_BUILD").is_some() {
            LevelFilter::Trace
        } else {
            LevelFilter::Debug
        })
    });

    if installed.is_err() {
        let _ = writeln!(MiniUart::attach(), "logger already installed");
    }
}

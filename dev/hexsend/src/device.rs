use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// The host end of the serial link. Line settings are left to whoever
/// configured the device (`stty`, `screen`, ...).
pub struct SerialDevice {
    file: File,
    line_delay: Duration,
}

impl SerialDevice {
    pub fn open<P: AsRef<Path>>(path: P, line_delay: Duration) -> io::Result<SerialDevice> {
        let file = OpenOptions::new().write(true).open(path)?;
        Ok(SerialDevice { file, line_delay })
    }

    pub fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\r\n")?;
        self.file.flush()?;

        if !self.line_delay.is_zero() {
            thread::sleep(self.line_delay);
        }
        Ok(())
    }
}

#[macro_use]
extern crate log;

mod cli;
mod device;
mod logger;
mod records;


use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::time::Duration;

use clap::Parser;

use cli::{HexsendArgs, HexsendCommand};
use device::SerialDevice;
use records::{encode_lines, verify_records};

fn main() {
    let HexsendArgs { verbose, command } = HexsendArgs::parse();
    logger::init_logger(verbose);

    let result = match command {
        HexsendCommand::Encode { image, base, entry, params, chunk, output } => {
            encode(&image, base, entry, &params, chunk, output.as_deref())
        }
        HexsendCommand::Verify { records } => verify(&records),
        HexsendCommand::Send { records, device, line_delay_ms } => {
            send(&records, &device, Duration::from_millis(line_delay_ms))
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn encode(
    image: &Path,
    base: u64,
    entry: Option<u64>,
    params: &[u64],
    chunk: u8,
    output: Option<&Path>,
) -> io::Result<()> {
    let bytes = fs::read(image)?;
    let lines = encode_lines(&bytes, base, entry, params, chunk)?;

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(io::BufWriter::new(fs::File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    for line in lines.iter() {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    info!(
        "encoded {} bytes at {:#x} into {} records",
        bytes.len(),
        base,
        lines.len()
    );
    Ok(())
}

fn verify(records: &Path) -> io::Result<()> {
    let text = fs::read_to_string(records)?;
    let (launch, stats) = verify_records(&text)?;

    info!("{} records, {} data bytes", stats.lines, stats.bytes_written);
    info!("entry point {:#x}", launch.entry);
    for (index, value) in launch.parameters.iter().enumerate() {
        info!("parameter {}: {:#x}", index, value);
    }
    Ok(())
}

fn send(records: &Path, device: &Path, line_delay: Duration) -> io::Result<()> {
    let text = fs::read_to_string(records)?;
    let (launch, stats) = verify_records(&text)?;
    debug!("verified {} records, entry {:#x}", stats.lines, launch.entry);

    let mut serial = SerialDevice::open(device, line_delay)?;
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|line| !line.is_empty()).collect();
    for (index, line) in lines.iter().enumerate() {
        serial.send_line(line)?;
        trace!("sent {}/{}", index + 1, lines.len());
    }

    info!("sent {} records to {}", lines.len(), device.display());
    Ok(())
}

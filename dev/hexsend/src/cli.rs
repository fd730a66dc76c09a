use std::path::PathBuf;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct HexsendArgs {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// The command to run
    #[command(subcommand)]
    pub command: HexsendCommand,
}

#[derive(Subcommand, Debug)]
pub enum HexsendCommand {
    /// Turn a raw kernel binary into record lines
    Encode {
        /// The raw binary to encode
        image: PathBuf,

        /// Address the first byte of the image is loaded at
        #[arg(short, long, value_parser = parse_address, default_value = "0x80000")]
        base: u64,

        /// Entry point, defaults to the load address
        #[arg(short, long, value_parser = parse_address)]
        entry: Option<u64>,

        /// A launch parameter; repeat up to four times, in slot order
        #[arg(short = 'p', long = "param", value_parser = parse_address)]
        params: Vec<u64>,

        /// Payload bytes per data record
        #[arg(short, long, default_value_t = 32, value_parser = clap::value_parser!(u8).range(1..))]
        chunk: u8,

        /// Where to write the records, stdout if absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Dry-run a record file without writing memory
    Verify {
        records: PathBuf,
    },
    /// Verify a record file, then stream it to a serial device
    Send {
        records: PathBuf,

        /// The serial device, already configured for the board's baud rate
        device: PathBuf,

        /// Pause after every line, for boards that drop characters
        #[arg(long, default_value_t = 0)]
        line_delay_ms: u64,
    },
}

/// Parses `0x`-prefixed hex or plain decimal, with optional `_` separators.
pub fn parse_address(value: &str) -> Result<u64, String> {
    let cleaned: String = value.trim().chars().filter(|c| *c != '_').collect();
    let parsed = match cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    };

    parsed.map_err(|e| format!("invalid address `{}`: {}", value, e))
}

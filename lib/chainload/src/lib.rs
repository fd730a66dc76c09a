#![cfg_attr(not(test), no_std)]

//! Record protocol used to chainload a kernel image over a serial line.
//!
//! Every transmitted line is one self-describing record:
//!
//! ```text
//! :LLAAAAAAAAAAAAAAAATT<payload>CC
//! ```
//!
//! `LL` is the payload length, `A..A` a 64-bit big-endian address, `TT` the
//! record type and `CC` the two's-complement checksum of every preceding
//! byte. Lines are decoded into a [`RawLine`], validated into a [`Record`]
//! and applied to a [`TargetWriter`], which either commits bytes to memory
//! or discards them.

#[cfg(feature = "alloc")]
extern crate alloc;

#[macro_use]
extern crate log;

pub mod checksum;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod memory;
pub mod record;
pub mod session;
pub mod writer;

pub use codec::{decode_line, RawLine};
pub use dispatch::{apply_record, Disposition};
pub use error::{LineError, ProtocolError, Result};
pub use memory::{BufferWriter, MemoryWriter};
pub use record::{Record, RecordType};
pub use session::{ErrorPolicy, Launch, LineSource, Session, SessionConfig, SessionError, SessionStats};
pub use writer::{NullWriter, TargetWriter, PARAMETER_COUNT};

#[cfg(feature = "alloc")]
pub use codec::{
    encode_data_record, encode_end_of_file, encode_set_device_time, encode_set_parameters,
    encode_start_linear_address, ImageEncoder,
};

/// Character that starts every line on the wire.
pub const MARKER: u8 = b':';

/// Largest payload a single record can carry.
pub const MAX_PAYLOAD: usize = 255;

/// Length byte, eight address bytes and the type byte.
pub const HEADER_BYTES: usize = 10;

/// Smallest well-formed record: header plus checksum, no payload.
pub const MIN_RECORD_BYTES: usize = HEADER_BYTES + 1;

/// Largest well-formed record.
pub const MAX_RECORD_BYTES: usize = MIN_RECORD_BYTES + MAX_PAYLOAD;

/// Longest line on the wire, marker included.
pub const MAX_LINE_CHARS: usize = 1 + 2 * MAX_RECORD_BYTES;

#[cfg(test)]
mod tests;

use core::fmt;

use crate::record::RecordType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// A character that is not a hex digit, or an odd number of digits.
    /// `index` is the offending position in the line, marker included.
    MalformedHex { index: usize },
    /// The line's character count disagrees with its length byte.
    LengthMismatch { expected: usize, actual: usize },
    /// The sum of every byte in the record is `residue`, not zero.
    BadChecksum { residue: u8 },
    /// The type byte is outside the closed set of record types.
    UnknownRecordType(u8),
    /// A fixed-size record declared the wrong length.
    MalformedRecordShape { kind: RecordType, length: u8 },
    /// The target writer refused byte `offset` of a data record.
    WriteFailed { address: u64, offset: usize },
    /// The encoder was given more than `MAX_PAYLOAD` bytes.
    PayloadTooLarge(usize),
}

pub type Result<T> = core::result::Result<T, ProtocolError>;

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MalformedHex { index } => {
                write!(f, "malformed hex at character {}", index)
            }
            ProtocolError::LengthMismatch { expected, actual } => {
                write!(f, "expected {} characters, line has {}", expected, actual)
            }
            ProtocolError::BadChecksum { residue } => {
                write!(f, "bad checksum (residue {:#04x})", residue)
            }
            ProtocolError::UnknownRecordType(code) => {
                write!(f, "unknown record type {:#04x}", code)
            }
            ProtocolError::MalformedRecordShape { kind, length } => {
                write!(f, "{:?} record cannot have length {}", kind, length)
            }
            ProtocolError::WriteFailed { address, offset } => {
                write!(f, "write refused at {:#x} (payload byte {})", address, offset)
            }
            ProtocolError::PayloadTooLarge(len) => {
                write!(f, "payload of {} bytes does not fit in a record", len)
            }
        }
    }
}

/// A protocol error tagged with the 1-based line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineError {
    pub line: usize,
    pub error: ProtocolError,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

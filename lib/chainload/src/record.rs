use crate::checksum;
use crate::error::{ProtocolError, Result};
use crate::writer::PARAMETER_COUNT;
use crate::{HEADER_BYTES, MIN_RECORD_BYTES};

const LENGTH_OFFSET: usize = 0;
const ADDRESS_OFFSET: usize = 1;
const TYPE_OFFSET: usize = 9;

const PARAMETERS_LENGTH: u8 = (8 * PARAMETER_COUNT) as u8;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Data = 0x00,
    EndOfFile = 0x01,
    StartLinearAddress = 0x05,
    SetParameters = 0x80,
    SetDeviceTime = 0x81,
}

impl TryFrom<u8> for RecordType {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<RecordType> {
        match code {
            0x00 => Ok(RecordType::Data),
            0x01 => Ok(RecordType::EndOfFile),
            0x05 => Ok(RecordType::StartLinearAddress),
            0x80 => Ok(RecordType::SetParameters),
            0x81 => Ok(RecordType::SetDeviceTime),
            _ => Err(ProtocolError::UnknownRecordType(code)),
        }
    }
}

/// A validated record. Data payloads borrow from the decoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    Data { address: u64, bytes: &'a [u8] },
    EndOfFile,
    StartLinearAddress { address: u64 },
    SetParameters([u64; PARAMETER_COUNT]),
    SetDeviceTime { seconds: u64 },
}

impl<'a> Record<'a> {
    /// Validates decoded bytes against the character count of the line they
    /// came from.
    ///
    /// The stages run in a fixed order and stop at the first failure: type
    /// code, then length and shape, then checksum. Each stage relies on the
    /// previous one for the offsets it reads.
    pub fn parse(bytes: &'a [u8], line_chars: usize) -> Result<Record<'a>> {
        if bytes.len() <= TYPE_OFFSET {
            return Err(ProtocolError::LengthMismatch {
                expected: checksum::expected_chars(0),
                actual: line_chars,
            });
        }

        let kind = RecordType::try_from(bytes[TYPE_OFFSET])?;
        let length = bytes[LENGTH_OFFSET];

        match kind {
            RecordType::StartLinearAddress if length != 0 || bytes.len() != MIN_RECORD_BYTES => {
                return Err(ProtocolError::MalformedRecordShape { kind, length });
            }
            RecordType::SetParameters if length != PARAMETERS_LENGTH => {
                return Err(ProtocolError::MalformedRecordShape { kind, length });
            }
            _ => {}
        }

        if !checksum::valid_length(line_chars, bytes)
            || bytes.len() != MIN_RECORD_BYTES + length as usize
        {
            return Err(ProtocolError::LengthMismatch {
                expected: checksum::expected_chars(length),
                actual: line_chars,
            });
        }

        if !checksum::is_valid(bytes) {
            return Err(ProtocolError::BadChecksum {
                residue: checksum::sum(bytes),
            });
        }

        let address = be_u64(&bytes[ADDRESS_OFFSET..TYPE_OFFSET]);
        let payload = &bytes[HEADER_BYTES..HEADER_BYTES + length as usize];

        Ok(match kind {
            RecordType::Data => Record::Data {
                address,
                bytes: payload,
            },
            RecordType::EndOfFile => Record::EndOfFile,
            RecordType::StartLinearAddress => Record::StartLinearAddress { address },
            RecordType::SetParameters => {
                let mut values = [0u64; PARAMETER_COUNT];
                for (value, chunk) in values.iter_mut().zip(payload.chunks_exact(8)) {
                    *value = be_u64(chunk);
                }
                Record::SetParameters(values)
            }
            RecordType::SetDeviceTime => Record::SetDeviceTime { seconds: address },
        })
    }

    pub fn kind(&self) -> RecordType {
        match self {
            Record::Data { .. } => RecordType::Data,
            Record::EndOfFile => RecordType::EndOfFile,
            Record::StartLinearAddress { .. } => RecordType::StartLinearAddress,
            Record::SetParameters(_) => RecordType::SetParameters,
            Record::SetDeviceTime { .. } => RecordType::SetDeviceTime,
        }
    }
}

fn be_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, byte| (acc << 8) | *byte as u64)
}

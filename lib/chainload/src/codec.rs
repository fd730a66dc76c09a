use core::fmt;

#[cfg(feature = "alloc")]
use alloc::string::{String, ToString};

use crate::checksum;
use crate::error::{ProtocolError, Result};
use crate::record::{Record, RecordType};
use crate::writer::PARAMETER_COUNT;
use crate::{HEADER_BYTES, MARKER, MAX_LINE_CHARS, MAX_PAYLOAD, MAX_RECORD_BYTES};

/// The bytes of one line, before any semantic validation.
///
/// Sized for the longest legal record so decoding never allocates.
#[derive(Clone)]
pub struct RawLine {
    buffer: [u8; MAX_RECORD_BYTES],
    len: usize,
    chars: usize,
}

impl RawLine {
    /// Converts the hex digits after the marker into bytes, most
    /// significant nibble first. Only the text is checked here; the length
    /// byte and checksum are left to [`RawLine::record`].
    pub fn decode(line: &[u8]) -> Result<RawLine> {
        match line.first() {
            Some(&MARKER) => {}
            _ => return Err(ProtocolError::MalformedHex { index: 0 }),
        }

        let digits = &line[1..];
        if digits.len() % 2 != 0 {
            return Err(ProtocolError::MalformedHex { index: line.len() });
        }
        if line.len() > MAX_LINE_CHARS {
            return Err(ProtocolError::LengthMismatch {
                expected: MAX_LINE_CHARS,
                actual: line.len(),
            });
        }

        let mut raw = RawLine::empty();
        for (i, pair) in digits.chunks_exact(2).enumerate() {
            let high = nibble(pair[0]).ok_or(ProtocolError::MalformedHex { index: 1 + 2 * i })?;
            let low = nibble(pair[1]).ok_or(ProtocolError::MalformedHex { index: 2 + 2 * i })?;
            raw.buffer[i] = (high << 4) | low;
        }
        raw.len = digits.len() / 2;
        raw.chars = line.len();

        Ok(raw)
    }

    /// Lays out a record with a correct length byte and checksum.
    pub fn build(kind: RecordType, address: u64, payload: &[u8]) -> Result<RawLine> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }

        Ok(RawLine::layout(kind, address, payload))
    }

    /// `payload` must be at most `MAX_PAYLOAD` bytes.
    fn layout(kind: RecordType, address: u64, payload: &[u8]) -> RawLine {
        let mut raw = RawLine::empty();
        raw.buffer[0] = payload.len() as u8;
        raw.buffer[1..9].copy_from_slice(&address.to_be_bytes());
        raw.buffer[9] = kind as u8;
        raw.buffer[HEADER_BYTES..HEADER_BYTES + payload.len()].copy_from_slice(payload);

        let body = HEADER_BYTES + payload.len();
        raw.buffer[body] = checksum::checksum(&raw.buffer[..body]);
        raw.len = body + 1;
        raw.chars = 1 + 2 * raw.len;

        raw
    }

    fn empty() -> RawLine {
        RawLine {
            buffer: [0; MAX_RECORD_BYTES],
            len: 0,
            chars: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Character count of the line this was decoded from, marker included.
    pub fn chars(&self) -> usize {
        self.chars
    }

    /// Validates the bytes and views them as a typed record.
    pub fn record(&self) -> Result<Record<'_>> {
        Record::parse(self.as_bytes(), self.chars)
    }
}

impl fmt::Display for RawLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", MARKER as char)?;
        for byte in self.as_bytes() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for RawLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawLine({})", self)
    }
}

fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Decodes the hex text of a line into its bytes.
pub fn decode_line(text: &str) -> Result<RawLine> {
    RawLine::decode(text.as_bytes())
}

/// Serializes the four launch parameters big-endian, in slot order.
pub fn parameter_payload(values: &[u64; PARAMETER_COUNT]) -> [u8; 8 * PARAMETER_COUNT] {
    let mut payload = [0u8; 8 * PARAMETER_COUNT];
    for (chunk, value) in payload.chunks_exact_mut(8).zip(values.iter()) {
        chunk.copy_from_slice(&value.to_be_bytes());
    }
    payload
}

#[cfg(feature = "alloc")]
pub fn encode_data_record(bytes: &[u8], address: u64) -> Result<String> {
    Ok(RawLine::build(RecordType::Data, address, bytes)?.to_string())
}

#[cfg(feature = "alloc")]
pub fn encode_start_linear_address(address: u64) -> String {
    fixed_record(RecordType::StartLinearAddress, address, &[])
}

#[cfg(feature = "alloc")]
pub fn encode_set_parameters(values: &[u64; PARAMETER_COUNT]) -> String {
    fixed_record(RecordType::SetParameters, 0, &parameter_payload(values))
}

#[cfg(feature = "alloc")]
pub fn encode_end_of_file() -> String {
    fixed_record(RecordType::EndOfFile, 0, &[])
}

/// The clock value travels in the address field.
#[cfg(feature = "alloc")]
pub fn encode_set_device_time(seconds: u64) -> String {
    fixed_record(RecordType::SetDeviceTime, seconds, &[])
}

/// Records whose payload size is fixed by their type: empty, or the
/// 32-byte parameter block.
#[cfg(feature = "alloc")]
fn fixed_record<const N: usize>(kind: RecordType, address: u64, payload: &[u8; N]) -> String {
    RawLine::layout(kind, address, payload).to_string()
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Data,
    Parameters,
    Entry,
    End,
    Done,
}

/// Splits an image loaded at `base` into record lines: data records of at
/// most `chunk` bytes, then parameters and entry point if given, then
/// end-of-file. Collect into `Result<Vec<String>>`.
#[cfg(feature = "alloc")]
pub struct ImageEncoder<'a> {
    image: &'a [u8],
    base: u64,
    chunk: usize,
    offset: usize,
    parameters: Option<[u64; PARAMETER_COUNT]>,
    entry: Option<u64>,
    stage: Stage,
}

#[cfg(feature = "alloc")]
impl<'a> ImageEncoder<'a> {
    pub fn new(image: &'a [u8], base: u64, chunk: usize) -> Result<ImageEncoder<'a>> {
        if chunk > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge(chunk));
        }

        Ok(ImageEncoder {
            image,
            base,
            chunk: chunk.max(1),
            offset: 0,
            parameters: None,
            entry: None,
            stage: Stage::Data,
        })
    }

    pub fn with_entry(mut self, entry: u64) -> Self {
        self.entry = Some(entry);
        self
    }

    pub fn with_parameters(mut self, parameters: [u64; PARAMETER_COUNT]) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[cfg(feature = "alloc")]
impl<'a> Iterator for ImageEncoder<'a> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Result<String>> {
        loop {
            match self.stage {
                Stage::Data => {
                    if self.offset >= self.image.len() {
                        self.stage = Stage::Parameters;
                        continue;
                    }
                    let end = (self.offset + self.chunk).min(self.image.len());
                    let address = self.base.wrapping_add(self.offset as u64);
                    let line = encode_data_record(&self.image[self.offset..end], address);
                    self.offset = end;
                    return Some(line);
                }
                Stage::Parameters => {
                    self.stage = Stage::Entry;
                    if let Some(parameters) = self.parameters {
                        return Some(Ok(encode_set_parameters(&parameters)));
                    }
                }
                Stage::Entry => {
                    self.stage = Stage::End;
                    if let Some(entry) = self.entry {
                        return Some(Ok(encode_start_linear_address(entry)));
                    }
                }
                Stage::End => {
                    self.stage = Stage::Done;
                    return Some(Ok(encode_end_of_file()));
                }
                Stage::Done => return None,
            }
        }
    }
}

//! Two's-complement residue shared by the decoder and the encoder.

/// Wrapping sum of `bytes`.
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte))
}

/// The checksum byte to append after `bytes` (length, address, type and
/// payload) so that the whole record sums to zero.
pub fn checksum(bytes: &[u8]) -> u8 {
    sum(bytes).wrapping_neg()
}

/// Returns `true` if `record`, stored checksum included, sums to zero.
pub fn is_valid(record: &[u8]) -> bool {
    sum(record) == 0
}

/// Characters a line with a payload of `length` bytes occupies, marker
/// included.
pub const fn expected_chars(length: u8) -> usize {
    // marker, length, 16 address digits, type, checksum
    23 + 2 * length as usize
}

/// Checks a line's character count against the length byte of its decoded
/// bytes. An empty buffer is never valid.
pub fn valid_length(declared_chars: usize, bytes: &[u8]) -> bool {
    match bytes.first() {
        Some(&length) => declared_chars == expected_chars(length),
        None => false,
    }
}

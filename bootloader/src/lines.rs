use chainload::{LineSource, MARKER};

/// A byte-at-a-time input. `None` means the input is gone for good.
pub trait ByteSource {
    fn next_byte(&mut self) -> Option<u8>;
}

/// Frames a byte stream into record lines.
///
/// Anything before a marker is line noise and is dropped. A line runs from
/// the marker up to the next CR or LF. Characters past the end of the
/// caller's buffer are dropped but still counted in the returned length.
pub struct MarkerLines<B: ByteSource> {
    input: B,
}

impl<B: ByteSource> MarkerLines<B> {
    pub fn new(input: B) -> MarkerLines<B> {
        MarkerLines { input }
    }
}

impl<B: ByteSource> LineSource for MarkerLines<B> {
    fn next_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        while self.input.next_byte()? != MARKER {}

        if let Some(first) = buf.first_mut() {
            *first = MARKER;
        }
        let mut len = 1;

        loop {
            match self.input.next_byte() {
                Some(b'\r') | Some(b'\n') | None => return Some(len),
                Some(byte) => {
                    if let Some(slot) = buf.get_mut(len) {
                        *slot = byte;
                    }
                    len += 1;
                }
            }
        }
    }
}

#[cfg(target_os = "none")]
impl ByteSource for &mut crate::uart::MiniUart {
    fn next_byte(&mut self) -> Option<u8> {
        Some(self.read_byte())
    }
}

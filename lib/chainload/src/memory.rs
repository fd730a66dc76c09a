use core::ops::Range;
use core::ptr::write_volatile;

use crate::writer::{delegate_bookkeeping, Bookkeeping, TargetWriter};

/// Commits bytes straight into physical memory.
///
/// Addresses inside `window` land at `base + (address - window.start)`;
/// anything outside the window is refused.
pub struct MemoryWriter {
    base: *mut u8,
    window: Range<u64>,
    state: Bookkeeping,
}

impl MemoryWriter {
    /// # Safety
    ///
    /// `base` must be valid for writes of `window.end - window.start` bytes
    /// for as long as the writer lives, and nothing else may rely on the
    /// contents of that region while the session runs.
    pub unsafe fn new(base: *mut u8, window: Range<u64>) -> MemoryWriter {
        MemoryWriter {
            base,
            window,
            state: Bookkeeping::new(),
        }
    }

    /// A writer for an identity-mapped window: address `a` is written at `a`.
    ///
    /// # Safety
    ///
    /// Same contract as [`MemoryWriter::new`].
    pub unsafe fn identity(window: Range<u64>) -> MemoryWriter {
        MemoryWriter::new(window.start as usize as *mut u8, window)
    }

    pub fn window(&self) -> &Range<u64> {
        &self.window
    }
}

impl TargetWriter for MemoryWriter {
    fn write(&mut self, address: u64, byte: u8) -> bool {
        if !self.window.contains(&address) {
            return false;
        }

        let offset = (address - self.window.start) as usize;
        unsafe {
            write_volatile(self.base.add(offset), byte);
        }
        true
    }

    delegate_bookkeeping!(state);
}

/// Commits bytes into a borrowed buffer that stands in for the region
/// starting at `base`.
pub struct BufferWriter<'a> {
    buffer: &'a mut [u8],
    base: u64,
    state: Bookkeeping,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buffer: &'a mut [u8], base: u64) -> BufferWriter<'a> {
        BufferWriter {
            buffer,
            base,
            state: Bookkeeping::new(),
        }
    }

    pub fn buffer(&self) -> &[u8] {
        self.buffer
    }

    pub fn base(&self) -> u64 {
        self.base
    }
}

impl<'a> TargetWriter for BufferWriter<'a> {
    fn write(&mut self, address: u64, byte: u8) -> bool {
        let slot = address
            .checked_sub(self.base)
            .and_then(|offset| usize::try_from(offset).ok())
            .and_then(|offset| self.buffer.get_mut(offset));

        match slot {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        }
    }

    delegate_bookkeeping!(state);
}

use core::marker::PhantomData;
use core::ops::Deref;

/// Views the register block at a fixed physical address.
pub struct Mmio<T> {
    start: usize,
    phantom: PhantomData<fn() -> T>,
}

impl<T> Mmio<T> {
    /// # Safety
    ///
    /// `start` must be the base of a device whose registers are laid out as
    /// `T`, mapped for the lifetime of the program.
    pub const unsafe fn new(start: usize) -> Mmio<T> {
        Mmio {
            start,
            phantom: PhantomData,
        }
    }
}

impl<T> Deref for Mmio<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*(self.start as *const T) }
    }
}

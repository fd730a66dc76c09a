/// Number of out-of-band parameter slots a session carries.
pub const PARAMETER_COUNT: usize = 4;

/// Sink that applies the effects of records to a target.
///
/// One writer belongs to one session. Dispatch never looks past this trait,
/// so the same stream can be applied to real memory or to an inert writer.
pub trait TargetWriter {
    /// Commits `byte` at `address`. Returns `false` if the writer refuses
    /// the address.
    fn write(&mut self, address: u64, byte: u8) -> bool;

    /// Records the address the loaded image starts at. Last call wins.
    fn set_entry_point(&mut self, address: u64);

    /// The entry point, or `None` if no image has announced one yet.
    fn entry_point(&self) -> Option<u64>;

    fn entry_point_is_set(&self) -> bool {
        self.entry_point().is_some()
    }

    /// Stores `value` in parameter slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= PARAMETER_COUNT`.
    fn set_parameter(&mut self, index: usize, value: u64);

    /// Reads parameter slot `index`; slots that were never set read as zero.
    ///
    /// # Panics
    ///
    /// Panics if `index >= PARAMETER_COUNT`.
    fn parameter(&self, index: usize) -> u64;
}

/// Entry point and parameter state shared by every writer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bookkeeping {
    entry: Option<u64>,
    parameters: [u64; PARAMETER_COUNT],
}

impl Bookkeeping {
    pub const fn new() -> Bookkeeping {
        Bookkeeping {
            entry: None,
            parameters: [0; PARAMETER_COUNT],
        }
    }

    pub fn set_entry_point(&mut self, address: u64) {
        self.entry = Some(address);
    }

    pub fn entry_point(&self) -> Option<u64> {
        self.entry
    }

    pub fn set_parameter(&mut self, index: usize, value: u64) {
        self.parameters[index] = value;
    }

    pub fn parameter(&self, index: usize) -> u64 {
        self.parameters[index]
    }
}

/// Forwards the entry point and parameter methods of `TargetWriter` to a
/// `Bookkeeping` field.
macro_rules! delegate_bookkeeping {
    ($field:ident) => {
        fn set_entry_point(&mut self, address: u64) {
            self.$field.set_entry_point(address)
        }

        fn entry_point(&self) -> Option<u64> {
            self.$field.entry_point()
        }

        fn set_parameter(&mut self, index: usize, value: u64) {
            self.$field.set_parameter(index, value)
        }

        fn parameter(&self, index: usize) -> u64 {
            self.$field.parameter(index)
        }
    };
}

pub(crate) use delegate_bookkeeping;

/// Discards every byte but keeps entry point and parameters, for dry runs.
#[derive(Debug, Default, Clone)]
pub struct NullWriter {
    state: Bookkeeping,
    discarded: usize,
}

impl NullWriter {
    pub const fn new() -> NullWriter {
        NullWriter {
            state: Bookkeeping::new(),
            discarded: 0,
        }
    }

    /// Bytes accepted and thrown away so far.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

impl TargetWriter for NullWriter {
    fn write(&mut self, _address: u64, _byte: u8) -> bool {
        self.discarded += 1;
        true
    }

    delegate_bookkeeping!(state);
}

use crate::error::{ProtocolError, Result};
use crate::record::Record;
use crate::writer::TargetWriter;

/// What the caller should do after a record was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Ask the line source for the next line.
    Continue,
    /// End of file: stop reading and launch.
    Final,
}

impl Disposition {
    pub fn is_final(self) -> bool {
        self == Disposition::Final
    }
}

/// Applies one validated record to `writer`.
///
/// A data record is written byte by byte; if the writer refuses a byte the
/// rest of the record is skipped and `WriteFailed` names the first refused
/// address. Bytes before it stay written.
pub fn apply_record<W: TargetWriter + ?Sized>(record: &Record<'_>, writer: &mut W) -> Result<Disposition> {
    match *record {
        Record::Data { address, bytes } => {
            for (offset, byte) in bytes.iter().enumerate() {
                let target = address.wrapping_add(offset as u64);
                if !writer.write(target, *byte) {
                    return Err(ProtocolError::WriteFailed {
                        address: target,
                        offset,
                    });
                }
            }
            trace!("wrote {} bytes at {:#x}", bytes.len(), address);
        }
        Record::EndOfFile => {
            trace!("end of file");
            return Ok(Disposition::Final);
        }
        Record::StartLinearAddress { address } => {
            if let Some(previous) = writer.entry_point() {
                warn!("entry point {:#x} replaced by {:#x}", previous, address);
            }
            writer.set_entry_point(address);
            trace!("entry point {:#x}", address);
        }
        Record::SetParameters(values) => {
            for (index, value) in values.iter().enumerate() {
                writer.set_parameter(index, *value);
            }
            trace!("parameters {:#x?}", values);
        }
        Record::SetDeviceTime { seconds } => {
            debug!("ignoring device time {}", seconds);
        }
    }

    Ok(Disposition::Continue)
}

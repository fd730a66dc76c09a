use core::fmt;

use crate::codec::RawLine;
use crate::dispatch::{apply_record, Disposition};
use crate::error::{LineError, ProtocolError};
use crate::record::Record;
use crate::writer::{TargetWriter, PARAMETER_COUNT};
use crate::MAX_LINE_CHARS;

/// Supplies one line of input per call.
pub trait LineSource {
    /// Fills `buf` with the next line, without its terminator, and returns
    /// the full length of the line. Returns `None` once the source has
    /// nothing more to give.
    ///
    /// A line longer than `buf` fills it and reports its real length, so
    /// the caller can tell it was cut short.
    fn next_line(&mut self, buf: &mut [u8]) -> Option<usize>;
}

/// How a session reacts to a line that fails to decode or apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log the error and move on to the next line.
    Continue,
    /// Stop the session at the first error.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub policy: ErrorPolicy,
    /// Under `ErrorPolicy::Continue`, give up once this many lines failed.
    pub max_errors: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            policy: ErrorPolicy::Continue,
            max_errors: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub lines: usize,
    pub records_applied: usize,
    pub errors: usize,
    pub bytes_written: usize,
}

/// Everything the launch sequencer needs to hand off to the loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launch {
    pub entry: u64,
    pub parameters: [u64; PARAMETER_COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The policy stopped the session on this line.
    Aborted(LineError),
    /// More lines failed than `max_errors` allows.
    TooManyErrors(usize),
    /// The source ran dry before an end-of-file record.
    SourceExhausted,
    /// End of file arrived but no start address was ever sent.
    NoEntryPoint,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Aborted(error) => write!(f, "aborted at {}", error),
            SessionError::TooManyErrors(count) => write!(f, "gave up after {} bad lines", count),
            SessionError::SourceExhausted => write!(f, "input ended before end-of-file record"),
            SessionError::NoEntryPoint => write!(f, "image has no entry point"),
        }
    }
}

/// One transfer: a stream of lines applied, in order, to the writer the
/// session owns.
pub struct Session<W: TargetWriter> {
    writer: W,
    config: SessionConfig,
    stats: SessionStats,
    finished: bool,
}

impl<W: TargetWriter> Session<W> {
    pub fn new(writer: W, config: SessionConfig) -> Session<W> {
        Session {
            writer,
            config,
            stats: SessionStats::default(),
            finished: false,
        }
    }

    /// Decodes, validates and applies one line. Trailing line terminators
    /// and spaces are ignored. Lines after end of file are not applied.
    pub fn feed<L: AsRef<[u8]>>(&mut self, line: L) -> Result<Disposition, LineError> {
        if self.finished {
            warn!("ignoring line after end of file");
            return Ok(Disposition::Final);
        }

        self.stats.lines += 1;
        let line = trim_end(line.as_ref());

        match self.apply_line(line) {
            Ok(disposition) => {
                self.stats.records_applied += 1;
                if disposition.is_final() {
                    self.finished = true;
                    debug!(
                        "session finished after {} lines, {} bytes",
                        self.stats.lines, self.stats.bytes_written
                    );
                }
                Ok(disposition)
            }
            Err(error) => {
                self.stats.errors += 1;
                Err(LineError {
                    line: self.stats.lines,
                    error,
                })
            }
        }
    }

    /// Counts a line that never reached the decoder as a failed one.
    fn reject(&mut self, error: ProtocolError) -> Result<Disposition, LineError> {
        self.stats.lines += 1;
        self.stats.errors += 1;
        Err(LineError {
            line: self.stats.lines,
            error,
        })
    }

    fn apply_line(&mut self, line: &[u8]) -> Result<Disposition, ProtocolError> {
        let raw = RawLine::decode(line)?;
        let record = raw.record()?;
        let disposition = apply_record(&record, &mut self.writer)?;

        if let Record::Data { bytes, .. } = record {
            self.stats.bytes_written += bytes.len();
        }

        Ok(disposition)
    }

    /// Pulls lines from `source` until end of file, applying the session's
    /// error policy to every bad line.
    pub fn run<S: LineSource + ?Sized>(&mut self, source: &mut S) -> Result<Launch, SessionError> {
        let mut buf = [0u8; MAX_LINE_CHARS + 2];

        while !self.finished {
            let len = source.next_line(&mut buf).ok_or(SessionError::SourceExhausted)?;
            let result = if len > buf.len() {
                self.reject(ProtocolError::LengthMismatch {
                    expected: MAX_LINE_CHARS,
                    actual: len,
                })
            } else {
                self.feed(&buf[..len])
            };

            if let Err(error) = result {
                match self.config.policy {
                    ErrorPolicy::Abort => {
                        error!("{}", error);
                        return Err(SessionError::Aborted(error));
                    }
                    ErrorPolicy::Continue => warn!("{}", error),
                }

                if let Some(limit) = self.config.max_errors {
                    if self.stats.errors >= limit {
                        error!("too many bad lines ({})", self.stats.errors);
                        return Err(SessionError::TooManyErrors(self.stats.errors));
                    }
                }
            }
        }

        self.launch().ok_or(SessionError::NoEntryPoint)
    }

    /// The launch values, available once end of file has been applied and
    /// an entry point is known.
    pub fn launch(&self) -> Option<Launch> {
        if !self.finished {
            return None;
        }

        let entry = self.writer.entry_point()?;
        let mut parameters = [0u64; PARAMETER_COUNT];
        for (index, value) in parameters.iter_mut().enumerate() {
            *value = self.writer.parameter(index);
        }

        Some(Launch { entry, parameters })
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn trim_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n' | b' ' | b'\t'] = line {
        line = rest;
    }
    line
}

use std::io::{self, Error, ErrorKind};
use std::str::Lines;

use chainload::session::ErrorPolicy;
use chainload::{ImageEncoder, Launch, LineSource, NullWriter, Session, SessionConfig, SessionStats, PARAMETER_COUNT};

/// Feeds the non-blank lines of a text file to a session.
pub struct TextLines<'a>(Lines<'a>);

impl<'a> TextLines<'a> {
    pub fn new(text: &'a str) -> TextLines<'a> {
        TextLines(text.lines())
    }
}

impl<'a> LineSource for TextLines<'a> {
    fn next_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        let line = self.0.by_ref().map(str::trim).find(|line| !line.is_empty())?;
        let len = line.len().min(buf.len());
        buf[..len].copy_from_slice(&line.as_bytes()[..len]);
        Some(line.len())
    }
}

/// Encodes `image` as it should land at `base`. Without an explicit entry
/// point the image starts at its first byte.
pub fn encode_lines(
    image: &[u8],
    base: u64,
    entry: Option<u64>,
    params: &[u64],
    chunk: u8,
) -> io::Result<Vec<String>> {
    if params.len() > PARAMETER_COUNT {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("at most {} parameters, got {}", PARAMETER_COUNT, params.len()),
        ));
    }

    let encoder = ImageEncoder::new(image, base, chunk as usize)
        .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))?
        .with_entry(entry.unwrap_or(base));

    let encoder = if params.is_empty() {
        encoder
    } else {
        let mut slots = [0u64; PARAMETER_COUNT];
        slots[..params.len()].copy_from_slice(params);
        encoder.with_parameters(slots)
    };

    encoder
        .collect::<chainload::Result<Vec<String>>>()
        .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))
}

/// Runs `text` through a session that discards every byte, stopping at the
/// first bad line.
pub fn verify_records(text: &str) -> io::Result<(Launch, SessionStats)> {
    let config = SessionConfig {
        policy: ErrorPolicy::Abort,
        max_errors: None,
    };
    let mut session = Session::new(NullWriter::new(), config);

    let launch = session
        .run(&mut TextLines::new(text))
        .map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;

    Ok((launch, session.stats()))
}

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::checksum;
use crate::codec::*;
use crate::dispatch::{apply_record, Disposition};
use crate::error::{LineError, ProtocolError};
use crate::memory::{BufferWriter, MemoryWriter};
use crate::record::{Record, RecordType};
use crate::session::*;
use crate::writer::{NullWriter, TargetWriter};

struct Lines(Vec<String>, usize);

impl Lines {
    fn new<I: IntoIterator<Item = S>, S: Into<String>>(lines: I) -> Lines {
        Lines(lines.into_iter().map(Into::into).collect(), 0)
    }
}

impl LineSource for Lines {
    fn next_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        let line = self.0.get(self.1)?;
        self.1 += 1;
        let len = line.len().min(buf.len());
        buf[..len].copy_from_slice(&line.as_bytes()[..len]);
        Some(line.len())
    }
}

fn decode(text: &str) -> Result<(RecordType, Vec<u8>, u64), ProtocolError> {
    let raw = decode_line(text)?;
    let record = raw.record()?;
    Ok(match record {
        Record::Data { address, bytes } => (RecordType::Data, bytes.to_vec(), address),
        Record::StartLinearAddress { address } => (RecordType::StartLinearAddress, vec![], address),
        other => (other.kind(), vec![], 0),
    })
}

fn apply_text<W: TargetWriter>(text: &str, writer: &mut W) -> Result<Disposition, ProtocolError> {
    let raw = decode_line(text)?;
    let record = raw.record()?;
    apply_record(&record, writer)
}

/// Re-encodes hex text with one byte replaced, leaving the checksum alone.
fn corrupt(text: &str, index: usize, value: u8) -> String {
    let raw = decode_line(text).unwrap();
    let mut bytes = raw.as_bytes().to_vec();
    bytes[index] = value;
    let mut out = String::from(":");
    for byte in bytes {
        out.push_str(&format!("{:02X}", byte));
    }
    out
}

#[test]
fn data_record_round_trip() {
    let payload = [0x01, 0x02, 0x00, 0x00, 0x00, 0x03];
    let text = encode_data_record(&payload, 0x1234).unwrap();
    assert_eq!(text.to_lowercase(), ":06000000000000123400010200000003ae");

    let (kind, bytes, address) = decode(&text).unwrap();
    assert_eq!(kind, RecordType::Data);
    assert_eq!(bytes, payload);
    assert_eq!(address, 0x1234);
}

#[test]
fn start_linear_address_round_trip() {
    let text = encode_start_linear_address(0x0000_00CD);
    assert_eq!(text.to_lowercase(), ":0000000000000000cd052e");

    let (kind, bytes, address) = decode(&text).unwrap();
    assert_eq!(kind, RecordType::StartLinearAddress);
    assert_eq!(address, 0xCD);
    assert!(bytes.is_empty());
}

#[test]
fn set_parameters_round_trip() {
    let values = [0xff, 0xff00, 0xff0000, 0xff000000];
    let text = encode_set_parameters(&values);
    assert_eq!(
        text,
        ":20000000000000000080\
         00000000000000FF000000000000FF00\
         0000000000FF000000000000FF000000\
         64"
    );

    let mut writer = NullWriter::new();
    assert_eq!(apply_text(&text, &mut writer), Ok(Disposition::Continue));
    for (index, value) in values.iter().enumerate() {
        assert_eq!(writer.parameter(index), *value);
    }
}

#[test]
fn fixed_records() {
    assert_eq!(encode_end_of_file(), ":00000000000000000001FF");
    assert_eq!(encode_set_device_time(1_700_000_000), ":00000000006553F10081D6");

    let raw = decode_line(&encode_set_device_time(42)).unwrap();
    assert_eq!(raw.record(), Ok(Record::SetDeviceTime { seconds: 42 }));
}

#[test]
fn decode_accepts_either_case() {
    let upper = decode_line(":06000000000000123400010200000003AE").unwrap();
    let lower = decode_line(":06000000000000123400010200000003ae").unwrap();
    assert_eq!(upper.as_bytes(), lower.as_bytes());
    assert_eq!(upper.len(), 17);
    assert_eq!(upper.chars(), 35);
}

#[test]
fn decode_rejects_bad_text() {
    assert_eq!(decode_line("").unwrap_err(), ProtocolError::MalformedHex { index: 0 });
    assert_eq!(decode_line("0000").unwrap_err(), ProtocolError::MalformedHex { index: 0 });
    assert_eq!(decode_line(":000").unwrap_err(), ProtocolError::MalformedHex { index: 4 });
    assert_eq!(decode_line(":00g0").unwrap_err(), ProtocolError::MalformedHex { index: 3 });
    assert_eq!(decode_line(":0 00").unwrap_err(), ProtocolError::MalformedHex { index: 2 });

    let long = format!(":{}", "00".repeat(crate::MAX_RECORD_BYTES + 1));
    assert!(matches!(
        decode_line(&long).unwrap_err(),
        ProtocolError::LengthMismatch { .. }
    ));
}

#[test]
fn encode_rejects_oversized_payload() {
    let payload = [0u8; 256];
    assert_eq!(
        encode_data_record(&payload, 0).unwrap_err(),
        ProtocolError::PayloadTooLarge(256)
    );

    let text = encode_data_record(&payload[..255], u64::MAX - 254).unwrap();
    assert_eq!(text.len(), crate::MAX_LINE_CHARS);
    let (_, bytes, address) = decode(&text).unwrap();
    assert_eq!(bytes.len(), 255);
    assert_eq!(address, u64::MAX - 254);
}

#[test]
fn unknown_record_type() {
    // Type byte 0x02 with a correct checksum.
    let line = ":00000000000000000002FE";
    assert_eq!(decode(line).unwrap_err(), ProtocolError::UnknownRecordType(0x02));
}

#[test]
fn length_mismatch() {
    // Length byte says 2, one payload byte present.
    let text = corrupt(&encode_data_record(&[0xAA], 0x10).unwrap(), 0, 2);
    assert_eq!(
        decode(&text).unwrap_err(),
        ProtocolError::LengthMismatch { expected: 27, actual: 25 }
    );

    assert_eq!(
        decode(":0000").unwrap_err(),
        ProtocolError::LengthMismatch { expected: 23, actual: 5 }
    );
}

#[test]
fn type_checked_before_length() {
    let text = corrupt(&encode_data_record(&[0xAA], 0x10).unwrap(), 9, 0x42);
    assert_eq!(decode(&text).unwrap_err(), ProtocolError::UnknownRecordType(0x42));
}

#[test]
fn length_checked_before_checksum() {
    // Wrong length byte also breaks the checksum; length must win.
    let text = corrupt(&encode_data_record(&[1, 2, 3], 0).unwrap(), 0, 4);
    assert!(matches!(
        decode(&text).unwrap_err(),
        ProtocolError::LengthMismatch { .. }
    ));
}

#[test]
fn every_valid_record_sums_to_zero() {
    let lines = [
        encode_data_record(&[0x01, 0x02, 0x00, 0x00, 0x00, 0x03], 0x1234).unwrap(),
        encode_start_linear_address(0xCD),
        encode_set_parameters(&[1, 2, 3, 4]),
        encode_end_of_file(),
        encode_set_device_time(7),
    ];

    for line in lines.iter() {
        let raw = decode_line(line).unwrap();
        assert_eq!(checksum::sum(raw.as_bytes()), 0, "{}", line);
    }
}

#[test]
fn random_payload_corruption_is_detected() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let len = rng.gen_range(1..=crate::MAX_PAYLOAD);
        let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let address: u64 = rng.gen();
        let text = encode_data_record(&payload, address).unwrap();

        let raw = decode_line(&text).unwrap();
        assert!(checksum::is_valid(raw.as_bytes()));

        let index = crate::HEADER_BYTES + rng.gen_range(0..len);
        let flip = rng.gen_range(1..=255u8);
        let corrupted = corrupt(&text, index, raw.as_bytes()[index] ^ flip);
        assert!(matches!(
            decode(&corrupted).unwrap_err(),
            ProtocolError::BadChecksum { .. }
        ));
    }
}

#[test]
fn start_linear_address_with_length_is_rejected() {
    let raw = RawLine::build(RecordType::StartLinearAddress, 0, &[0, 0, 0, 0xCD]).unwrap();
    let text = raw.to_string();
    assert_eq!(text, ":04000000000000000005000000CD2A");

    let mut writer = NullWriter::new();
    assert_eq!(
        apply_text(&text, &mut writer).unwrap_err(),
        ProtocolError::MalformedRecordShape {
            kind: RecordType::StartLinearAddress,
            length: 4
        }
    );
    assert!(!writer.entry_point_is_set());
}

#[test]
fn start_linear_address_with_extra_bytes_is_rejected() {
    // Zero length byte, but two trailing bytes beyond the eleven allowed.
    let text = format!("{}0000", encode_start_linear_address(0xCD));
    let mut writer = NullWriter::new();
    assert_eq!(
        apply_text(&text, &mut writer).unwrap_err(),
        ProtocolError::MalformedRecordShape {
            kind: RecordType::StartLinearAddress,
            length: 0
        }
    );
    assert_eq!(writer.entry_point(), None);
}

#[test]
fn set_parameters_needs_thirty_two_bytes() {
    let raw = RawLine::build(RecordType::SetParameters, 0, &[0u8; 24]).unwrap();
    let mut writer = NullWriter::new();
    assert_eq!(
        apply_text(&raw.to_string(), &mut writer).unwrap_err(),
        ProtocolError::MalformedRecordShape {
            kind: RecordType::SetParameters,
            length: 24
        }
    );
}

#[test]
fn entry_point_unset_is_not_zero() {
    let mut writer = NullWriter::new();
    assert!(!writer.entry_point_is_set());
    assert_eq!(writer.entry_point(), None);

    apply_text(&encode_start_linear_address(0), &mut writer).unwrap();
    assert!(writer.entry_point_is_set());
    assert_eq!(writer.entry_point(), Some(0));

    apply_text(&encode_start_linear_address(0x80000), &mut writer).unwrap();
    assert_eq!(writer.entry_point(), Some(0x80000));
}

#[test]
fn end_to_end_session() {
    let payload: Vec<u8> = (0..11).collect();
    let lines = [
        encode_data_record(&payload, 0x10).unwrap(),
        encode_start_linear_address(0xCD),
        encode_end_of_file(),
    ];

    let mut memory = [0u8; 0x40];
    let mut writer = BufferWriter::new(&mut memory, 0);

    assert_eq!(apply_text(&lines[0], &mut writer), Ok(Disposition::Continue));
    assert_eq!(apply_text(&lines[1], &mut writer), Ok(Disposition::Continue));
    assert_eq!(apply_text(&lines[2], &mut writer), Ok(Disposition::Final));

    assert!(writer.entry_point_is_set());
    assert_eq!(writer.entry_point(), Some(0xCD));
    assert_eq!(&writer.buffer()[0x10..0x1b], &payload[..]);
    assert!(writer.buffer()[..0x10].iter().all(|b| *b == 0));
    assert!(writer.buffer()[0x1b..].iter().all(|b| *b == 0));
}

#[test]
fn repeated_data_record_overwrites() {
    let text = encode_data_record(&[0xDE, 0xAD, 0xBE, 0xEF], 4).unwrap();

    let mut once = [0u8; 16];
    apply_text(&text, &mut BufferWriter::new(&mut once, 0)).unwrap();

    let mut twice = [0u8; 16];
    let mut writer = BufferWriter::new(&mut twice, 0);
    apply_text(&text, &mut writer).unwrap();
    apply_text(&text, &mut writer).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn refused_write_stops_record() {
    let mut memory = [0u8; 8];
    let mut writer = BufferWriter::new(&mut memory, 0x100);
    let text = encode_data_record(&[1, 2, 3, 4], 0x106).unwrap();

    assert_eq!(
        apply_text(&text, &mut writer).unwrap_err(),
        ProtocolError::WriteFailed { address: 0x108, offset: 2 }
    );
    assert_eq!(writer.buffer(), &[0, 0, 0, 0, 0, 0, 1, 2]);

    let below = encode_data_record(&[9], 0xff).unwrap();
    assert_eq!(
        apply_text(&below, &mut writer).unwrap_err(),
        ProtocolError::WriteFailed { address: 0xff, offset: 0 }
    );
}

#[test]
fn memory_writer_guards_window() {
    let mut memory = vec![0u8; 32];
    let mut writer = unsafe { MemoryWriter::new(memory.as_mut_ptr(), 0x8_0000..0x8_0020) };

    assert!(writer.write(0x8_0000, 0x11));
    assert!(writer.write(0x8_001f, 0x22));
    assert!(!writer.write(0x8_0020, 0x33));
    assert!(!writer.write(0x7_ffff, 0x44));

    writer.set_parameter(3, 9);
    assert_eq!(writer.parameter(3), 9);
    assert_eq!(writer.parameter(0), 0);
    drop(writer);

    assert_eq!(memory[0], 0x11);
    assert_eq!(memory[31], 0x22);
}

#[test]
fn null_writer_discards_bytes() {
    let mut writer = NullWriter::new();
    apply_text(&encode_data_record(&[1, 2, 3], u64::MAX - 1).unwrap(), &mut writer).unwrap();
    assert_eq!(writer.discarded(), 3);
}

#[test]
fn session_runs_until_end_of_file() {
    let image: Vec<u8> = (0..100u8).collect();
    let lines: Vec<String> = ImageEncoder::new(&image, 0x1000, 32)
        .unwrap()
        .with_parameters([1, 2, 3, 4])
        .with_entry(0x1000)
        .chain(std::iter::once(Ok(String::from("trailing garbage"))))
        .collect::<Result<Vec<String>, ProtocolError>>()
        .unwrap();
    assert_eq!(lines.len(), 4 + 3 + 1);

    let mut memory = vec![0u8; 0x100];
    let mut session = Session::new(BufferWriter::new(&mut memory, 0x1000), SessionConfig::default());
    let launch = session.run(&mut Lines::new(lines)).unwrap();

    assert_eq!(launch, Launch { entry: 0x1000, parameters: [1, 2, 3, 4] });
    assert_eq!(session.stats().bytes_written, 100);
    assert_eq!(session.stats().lines, 7);
    assert_eq!(session.stats().errors, 0);
    assert!(session.is_finished());
    assert_eq!(&session.into_writer().buffer()[..100], &image[..]);
}

#[test]
fn session_continues_past_bad_lines() {
    let lines = vec![
        encode_data_record(&[1], 0).unwrap(),
        String::from(":zz"),
        encode_start_linear_address(0x40),
        format!("{}\r\n", encode_end_of_file()),
    ];

    let mut session = Session::new(NullWriter::new(), SessionConfig::default());
    let launch = session.run(&mut Lines::new(lines)).unwrap();
    assert_eq!(launch.entry, 0x40);
    assert_eq!(session.stats().errors, 1);
    assert_eq!(session.stats().records_applied, 3);
}

#[test]
fn session_continues_past_refused_write() {
    let mut memory = [0u8; 8];
    let lines = vec![
        encode_data_record(&[1, 2, 3, 4], 0x06).unwrap(),
        encode_start_linear_address(0x40),
        encode_end_of_file(),
    ];

    let mut session = Session::new(BufferWriter::new(&mut memory, 0), SessionConfig::default());
    let launch = session.run(&mut Lines::new(lines)).unwrap();
    assert_eq!(launch.entry, 0x40);

    let stats = session.stats();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.records_applied, 2);
    assert_eq!(stats.bytes_written, 0);
    assert_eq!(session.writer().buffer(), &[0, 0, 0, 0, 0, 0, 1, 2]);
}

#[test]
fn session_rejects_overlong_line() {
    let full = encode_data_record(&[0x11; 255], 0).unwrap();
    assert_eq!(full.len(), crate::MAX_LINE_CHARS);

    let tailed = format!("{}  GARBAGE-TAIL", full);
    let lines = vec![
        tailed.clone(),
        encode_start_linear_address(0x80),
        encode_end_of_file(),
    ];

    let mut session = Session::new(NullWriter::new(), SessionConfig::default());
    assert_eq!(session.run(&mut Lines::new(lines)).unwrap().entry, 0x80);
    assert_eq!(session.stats().errors, 1);
    assert_eq!(session.stats().bytes_written, 0);
    assert_eq!(session.writer().discarded(), 0);

    let config = SessionConfig {
        policy: ErrorPolicy::Abort,
        max_errors: None,
    };
    let mut session = Session::new(NullWriter::new(), config);
    assert_eq!(
        session.run(&mut Lines::new(vec![tailed.clone()])).unwrap_err(),
        SessionError::Aborted(LineError {
            line: 1,
            error: ProtocolError::LengthMismatch {
                expected: crate::MAX_LINE_CHARS,
                actual: tailed.len(),
            }
        })
    );
}

#[test]
fn session_accepts_full_line_with_trailing_blanks() {
    let lines = vec![
        format!("{}  ", encode_data_record(&[0x11; 255], 0).unwrap()),
        encode_start_linear_address(0),
        encode_end_of_file(),
    ];

    let mut session = Session::new(NullWriter::new(), SessionConfig::default());
    session.run(&mut Lines::new(lines)).unwrap();
    assert_eq!(session.stats().errors, 0);
    assert_eq!(session.stats().bytes_written, 255);
}

#[test]
fn session_aborts_on_first_error() {
    let lines = vec![
        encode_start_linear_address(0x40),
        String::from(":00000000000000000002FE"),
        encode_end_of_file(),
    ];

    let config = SessionConfig {
        policy: ErrorPolicy::Abort,
        max_errors: None,
    };
    let mut session = Session::new(NullWriter::new(), config);
    assert_eq!(
        session.run(&mut Lines::new(lines)).unwrap_err(),
        SessionError::Aborted(LineError {
            line: 2,
            error: ProtocolError::UnknownRecordType(0x02)
        })
    );
    assert!(!session.is_finished());
    assert_eq!(session.launch(), None);
}

#[test]
fn session_gives_up_after_max_errors() {
    let lines = vec![":00", ":01", ":02", ":03"];
    let config = SessionConfig {
        policy: ErrorPolicy::Continue,
        max_errors: Some(2),
    };
    let mut session = Session::new(NullWriter::new(), config);
    assert_eq!(
        session.run(&mut Lines::new(lines)).unwrap_err(),
        SessionError::TooManyErrors(2)
    );
}

#[test]
fn session_needs_end_of_file_and_entry() {
    let mut session = Session::new(NullWriter::new(), SessionConfig::default());
    let lines = vec![encode_start_linear_address(0x40)];
    assert_eq!(
        session.run(&mut Lines::new(lines)).unwrap_err(),
        SessionError::SourceExhausted
    );

    let mut session = Session::new(NullWriter::new(), SessionConfig::default());
    let lines = vec![encode_data_record(&[1], 0).unwrap(), encode_end_of_file()];
    assert_eq!(
        session.run(&mut Lines::new(lines)).unwrap_err(),
        SessionError::NoEntryPoint
    );
}

#[test]
fn final_only_on_end_of_file() {
    let mut session = Session::new(NullWriter::new(), SessionConfig::default());
    assert_eq!(session.feed(encode_set_parameters(&[0; 4])), Ok(Disposition::Continue));
    assert_eq!(session.feed(encode_start_linear_address(8)), Ok(Disposition::Continue));
    assert_eq!(session.feed(encode_set_device_time(0)), Ok(Disposition::Continue));
    assert!(session.launch().is_none());

    assert_eq!(session.feed(encode_end_of_file()), Ok(Disposition::Final));
    assert_eq!(session.launch().map(|launch| launch.entry), Some(8));

    // Anything after end of file is ignored.
    assert_eq!(session.feed(encode_start_linear_address(16)), Ok(Disposition::Final));
    assert_eq!(session.writer().entry_point(), Some(8));
    assert_eq!(session.stats().lines, 4);
}

#[test]
fn image_encoder_splits_chunks() {
    let image = [0xAAu8; 70];
    let lines: Vec<String> = ImageEncoder::new(&image, 0x8_0000, 32)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[3], encode_end_of_file());

    let addresses: Vec<u64> = lines[..3].iter().map(|line| decode(line).unwrap().2).collect();
    assert_eq!(addresses, vec![0x8_0000, 0x8_0020, 0x8_0040]);
    assert_eq!(decode(&lines[2]).unwrap().1.len(), 6);

    assert_eq!(
        ImageEncoder::new(&image, 0, 256).err(),
        Some(ProtocolError::PayloadTooLarge(256))
    );
}

#[test]
fn encoders_never_emit_blank_lines() {
    let image = [0x5Au8; 300];
    let encoder = ImageEncoder::new(&image, 0, 255)
        .unwrap()
        .with_parameters([u64::MAX; 4])
        .with_entry(u64::MAX);

    for line in encoder {
        let line = line.unwrap();
        assert!(line.starts_with(':'), "{:?}", line);
        assert!(decode(&line).is_ok(), "{}", line);
    }

    for line in [
        encode_start_linear_address(u64::MAX),
        encode_set_parameters(&[u64::MAX; 4]),
        encode_end_of_file(),
        encode_set_device_time(u64::MAX),
    ] {
        assert!(decode(&line).is_ok(), "{}", line);
    }
    assert_eq!(
        encode_data_record(&[0; 256], 0),
        Err(ProtocolError::PayloadTooLarge(256))
    );
}

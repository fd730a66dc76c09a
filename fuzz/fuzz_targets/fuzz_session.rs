#![no_main]

use libfuzzer_sys::fuzz_target;

use chainload::{BufferWriter, ProtocolError, RawLine, Session, SessionConfig, TargetWriter};

const WINDOW: usize = 4096;
const BASE: u64 = 0x8_0000;

fuzz_target!(|data: &[u8]| {
    let mut memory = [0u8; WINDOW];
    let mut session = Session::new(BufferWriter::new(&mut memory, BASE), SessionConfig::default());

    let mut accepted_final = false;
    for line in data.split(|byte| *byte == b'\n') {
        let checked = RawLine::decode(line).and_then(|raw| raw.record().map(|r| r.kind()));
        let result = session.feed(line);

        // Validation and dispatch agree on what is acceptable, except for
        // data the writer refuses.
        if let (Ok(_), Err(error)) = (&checked, &result) {
            assert!(matches!(error.error, ProtocolError::WriteFailed { .. }));
        }
        if let Ok(disposition) = result {
            if disposition.is_final() {
                accepted_final = true;
                break;
            }
        }
    }

    assert_eq!(session.is_finished(), accepted_final);
    if let Some(launch) = session.launch() {
        assert!(session.is_finished());
        assert_eq!(Some(launch.entry), session.writer().entry_point());
    }
});

//! Fuzz target: `Frame` field extraction
//!
//! Parses arbitrary bytes as a telemetry frame and walks every lookup the
//! monitor performs.  Extraction must never panic, and any payload it
//! returns must decode or report a short buffer.
//!
//! cargo fuzz run fuzz_frame_extract

#![no_main]

use libfuzzer_sys::fuzz_target;
use powermon::sensors::{Frame, decode_sample};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(frame) = Frame::from_json(text) else {
        return;
    };

    let _ = frame.connection_label("PWM-1");
    if let Ok(Some(bytes)) = frame.sample_bytes("PWM-1", "main", "ch1") {
        match decode_sample(&bytes) {
            Ok(v) => assert!(v.is_finite()),
            Err(_) => assert!(bytes.len() < 4),
        }
    }
});

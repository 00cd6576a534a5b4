//! Fuzz target: `decode_sample`
//!
//! cargo fuzz run fuzz_sample_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use powermon::sensors::decode_sample;

fuzz_target!(|data: &[u8]| {
    match decode_sample(data) {
        Ok(v) => {
            assert!(v.is_finite());
            assert!(v.abs() <= f64::from(i32::MAX) * 1e-6 + 1e-6);
        }
        Err(_) => assert!(data.len() < 4),
    }
});

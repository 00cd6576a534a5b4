//! Voltage sample decoder.
//!
//! The digitiser ships each reading as a buffer whose trailing four bytes
//! hold the latest sample as a little-endian `i32` in microvolts.  Earlier
//! bytes (if any) are older samples from the same block and are ignored.
//!
//! ```text
//!  … older samples … ┌────┬────┬────┬────┐
//!                    │ b0 │ b1 │ b2 │ b3 │  i32 LE, µV
//!                    └────┴────┴────┴────┘
//! ```

use crate::error::DecodeError;

/// Width of one sample word in bytes.
pub const SAMPLE_WIDTH: usize = 4;

/// Volts per raw count (the digitiser reports microvolts).
pub const VOLTS_PER_COUNT: f64 = 1e-6;

/// Extract the raw signed count from the last [`SAMPLE_WIDTH`] bytes.
pub fn raw_count(buf: &[u8]) -> Result<i32, DecodeError> {
    let Some(start) = buf.len().checked_sub(SAMPLE_WIDTH) else {
        return Err(DecodeError::ShortPayload { len: buf.len() });
    };
    let mut word = [0u8; SAMPLE_WIDTH];
    word.copy_from_slice(&buf[start..]);
    Ok(i32::from_le_bytes(word))
}

/// Decode the trailing sample of `buf` into volts.
pub fn decode_sample(buf: &[u8]) -> Result<f64, DecodeError> {
    raw_count(buf).map(|count| f64::from(count) * VOLTS_PER_COUNT)
}

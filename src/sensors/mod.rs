//! Sample path: telemetry frame extraction and voltage decoding.
//!
//! The ingestion loop pulls a [`Frame`](frame::Frame) off the queue, asks it
//! for the configured channel's bytes, and hands them to
//! [`decode_sample`](voltage::decode_sample).

pub mod frame;
pub mod voltage;

pub use frame::Frame;
pub use voltage::decode_sample;

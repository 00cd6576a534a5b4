//! Unified error types for the power monitor.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! ingestion loop can decide in one place which failures are skippable
//! and which stop the loop.

use core::fmt;

use crate::app::ports::{ConfigError, PortError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the monitor funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A sample payload could not be turned into a voltage.
    Decode(DecodeError),
    /// A telemetry frame did not have the expected shape.
    Frame(FrameError),
    /// An external collaborator (trigger, telemetry source, ...) failed.
    Port(PortError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Port(e) => write!(f, "port: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than four bytes were available for the sample word.
    ShortPayload { len: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortPayload { len } => {
                write!(f, "sample payload too short ({len} bytes, need 4)")
            }
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

/// A field was present in a frame but had the wrong shape.
///
/// Missing fields are never errors; extraction returns `Ok(None)` for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A node that must be a mapping was something else.
    NotAnObject(&'static str),
    /// `connection_state` was present but not a string.
    StateNotString,
    /// The sample payload was not an array of integers.
    PayloadNotBytes,
    /// A payload element did not fit in a byte.
    ByteOutOfRange(i64),
    /// The raw frame text could not be parsed.
    Parse(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject(what) => write!(f, "{what} is not an object"),
            Self::StateNotString => write!(f, "connection_state is not a string"),
            Self::PayloadNotBytes => write!(f, "sample payload is not a byte array"),
            Self::ByteOutOfRange(v) => write!(f, "payload element {v} out of byte range"),
            Self::Parse(msg) => write!(f, "unparseable frame: {msg}"),
        }
    }
}

impl FrameError {
    /// True when the payload itself was reached but its contents are bad,
    /// as opposed to a wrong-shaped node on the way to it.
    pub fn is_payload(&self) -> bool {
        matches!(self, Self::PayloadNotBytes | Self::ByteOutOfRange(_))
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

impl From<PortError> for Error {
    fn from(e: PortError) -> Self {
        Self::Port(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

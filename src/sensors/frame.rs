//! Telemetry frames as delivered by the telemetry source.
//!
//! A frame maps reader identity to that reader's packet:
//!
//! ```text
//! {
//!   "<reader id>": {
//!     "connection_state": "connected",            // optional
//!     "streams": {                                // optional
//!       "<stream>": { "samples": { "<channel>": [b0, b1, …] } }
//!     }
//!   }
//! }
//! ```
//!
//! Extraction distinguishes *absent* (normal, `Ok(None)`) from *present but
//! wrong shape* (`Err(FrameError)`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FrameError;

pub const CONNECTION_STATE_KEY: &str = "connection_state";
pub const STREAMS_KEY: &str = "streams";
pub const SAMPLES_KEY: &str = "samples";

/// One delivery from the telemetry source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    readers: Map<String, Value>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame carrying a single reader packet.
    pub fn for_reader(reader_id: &str, packet: Value) -> Self {
        let mut frame = Self::new();
        frame.insert(reader_id, packet);
        frame
    }

    /// A frame carrying only a connection-state update.
    pub fn connection_state(reader_id: &str, label: &str) -> Self {
        Self::for_reader(
            reader_id,
            serde_json::json!({ CONNECTION_STATE_KEY: label }),
        )
    }

    /// A frame carrying one channel's sample bytes.
    pub fn samples(reader_id: &str, stream: &str, channel: &str, bytes: &[u8]) -> Self {
        Self::for_reader(
            reader_id,
            serde_json::json!({
                STREAMS_KEY: { stream: { SAMPLES_KEY: { channel: bytes } } }
            }),
        )
    }

    /// Parse a frame from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(|e| FrameError::Parse(e.to_string()))
    }

    pub fn insert(&mut self, reader_id: &str, packet: Value) {
        self.readers.insert(reader_id.to_owned(), packet);
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// The `connection_state` label for `reader_id`, if the frame has one.
    pub fn connection_label(&self, reader_id: &str) -> Result<Option<&str>, FrameError> {
        let Some(packet) = self.packet(reader_id)? else {
            return Ok(None);
        };
        match packet.get(CONNECTION_STATE_KEY) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(FrameError::StateNotString),
        }
    }

    /// The sample payload for `stream`/`channel` on `reader_id`, if present.
    pub fn sample_bytes(
        &self,
        reader_id: &str,
        stream: &str,
        channel: &str,
    ) -> Result<Option<Vec<u8>>, FrameError> {
        let Some(packet) = self.packet(reader_id)? else {
            return Ok(None);
        };
        let Some(streams) = child_object(packet, STREAMS_KEY, "streams")? else {
            return Ok(None);
        };
        let Some(stream) = child_object(streams, stream, "stream")? else {
            return Ok(None);
        };
        let Some(samples) = child_object(stream, SAMPLES_KEY, "samples")? else {
            return Ok(None);
        };
        match samples.get(channel) {
            None => Ok(None),
            Some(payload) => payload_bytes(payload).map(Some),
        }
    }

    fn packet(&self, reader_id: &str) -> Result<Option<&Map<String, Value>>, FrameError> {
        match self.readers.get(reader_id) {
            None => Ok(None),
            Some(Value::Object(packet)) => Ok(Some(packet)),
            Some(_) => Err(FrameError::NotAnObject("reader packet")),
        }
    }
}

fn child_object<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    what: &'static str,
) -> Result<Option<&'a Map<String, Value>>, FrameError> {
    match parent.get(key) {
        None => Ok(None),
        Some(Value::Object(child)) => Ok(Some(child)),
        Some(_) => Err(FrameError::NotAnObject(what)),
    }
}

fn payload_bytes(payload: &Value) -> Result<Vec<u8>, FrameError> {
    let Value::Array(items) = payload else {
        return Err(FrameError::PayloadNotBytes);
    };
    items
        .iter()
        .map(|item| {
            let n = item.as_i64().ok_or(FrameError::PayloadNotBytes)?;
            u8::try_from(n).map_err(|_| FrameError::ByteOutOfRange(n))
        })
        .collect()
}

//! Outbound application events and the alert record.
//!
//! The [`MonitorService`](super::service::MonitorService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, web UI push, …).

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::{MAX_RECIPIENTS, MonitorConfig};
use crate::fsm::{Direction, MonitorState};

/// A confirmed transition, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub direction: Direction,
    pub message: String,
    pub recipients: heapless::Vec<String, MAX_RECIPIENTS>,
    pub timestamp: NaiveDateTime,
}

impl AlertEvent {
    /// Build the alert for `direction` from the active config.
    pub fn new(direction: Direction, config: &MonitorConfig, timestamp: NaiveDateTime) -> Self {
        Self {
            direction,
            message: config.message_for(direction).to_owned(),
            // A filtered subset of the config's list, so it fits the same capacity.
            recipients: config.active_recipients().map(str::to_owned).collect(),
            timestamp,
        }
    }
}

/// Structured events emitted by the monitor core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The ingestion loop subscribed and is running.
    Started { reader_id: String },

    /// The monitor state changed.
    StateChanged {
        from: MonitorState,
        to: MonitorState,
        voltage: f64,
    },

    /// A confirmed transition was dispatched.
    AlertDispatched {
        direction: Direction,
        delivered: usize,
        failed: usize,
    },

    /// The telemetry source link went up or down.
    ConnectionChanged { connected: bool },

    /// The ingestion loop exited.
    Stopped { fatal: bool },
}

/// Answer to the status query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub curr_voltage: f64,
    #[serde(serialize_with = "serialize_state_label")]
    pub curr_state: MonitorState,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            curr_voltage: 0.0,
            curr_state: MonitorState::Unknown,
        }
    }
}

fn serialize_state_label<S: serde::Serializer>(
    state: &MonitorState,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(state.label())
}

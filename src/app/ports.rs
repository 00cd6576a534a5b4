//! Port traits: the hexagonal boundary between the monitor core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MonitorService (domain)
//! ```
//!
//! Driven adapters (telemetry transport, SMS gateway, trigger output, the
//! host's fault list, config storage) implement these traits.  The core
//! only ever talks to them through trait objects handed in at construction,
//! so every path is testable with recording mocks.

use std::sync::Arc;

use chrono::NaiveDateTime;
use crossbeam::channel::Sender;

use crate::config::MonitorConfig;
use crate::sensors::Frame;

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Telemetry source (driving adapter: transport → frame queue)
// ───────────────────────────────────────────────────────────────

/// Network location of the telemetry source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub ip: String,
    pub port: String,
}

impl core::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Which stream/channel the monitor samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFilter {
    pub stream: String,
    pub channel: String,
}

/// Buffering and reconnect policy sent with every subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionParams {
    /// Reader name announced to the source.
    pub reader_name: &'static str,
    /// Client name sent in the handshake.
    pub client_name: &'static str,
    /// Re-establish the connection after it drops.
    pub reconnect: bool,
    /// Seconds between reconnect attempts.
    pub reconnect_period_secs: u64,
    /// Ask the source to discard its backlog on connect.
    pub flush_buffer: bool,
    /// Data classes to subscribe to.
    pub subscriptions: &'static [&'static str],
}

impl Default for SubscriptionParams {
    fn default() -> Self {
        Self {
            reader_name: "PWM",
            client_name: "POWERMON",
            reconnect: true,
            reconnect_period_secs: 60,
            flush_buffer: false,
            subscriptions: &["streams"],
        }
    }
}

/// Opaque subscription identity.  Frames are keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub String);

impl SubscriptionHandle {
    pub fn reader_id(&self) -> &str {
        &self.0
    }
}

/// Where a subscription delivers frames.  Bounded: a full queue blocks the
/// producer.
pub type FrameSink = Sender<Frame>;

/// Streaming transport that delivers telemetry frames asynchronously.
pub trait TelemetrySource {
    /// Open a subscription.  Frames start flowing into `sink` immediately.
    fn subscribe(
        &mut self,
        endpoint: &Endpoint,
        filter: &StreamFilter,
        params: &SubscriptionParams,
        sink: FrameSink,
    ) -> Result<SubscriptionHandle, PortError>;

    /// Close a subscription.  Unknown handles are ignored.
    fn unsubscribe(&mut self, handle: &SubscriptionHandle);
}

// ───────────────────────────────────────────────────────────────
// Alert output ports (driven adapters: domain → outside)
// ───────────────────────────────────────────────────────────────

/// Text-message delivery (SMS gateway or similar).  Best effort.
pub trait NotificationPort {
    fn send_text(&self, recipient: &str, message: &str) -> Result<(), PortError>;
}

/// Generic alarm output pulsed once per confirmed transition.
pub trait TriggerPort {
    fn fire(&self) -> Result<(), PortError>;
}

/// Wall-clock source for alert timestamps.
pub trait ClockPort {
    fn now(&self) -> NaiveDateTime;
}

// ───────────────────────────────────────────────────────────────
// Fault registry (shared with the rest of the host process)
// ───────────────────────────────────────────────────────────────

/// Process-wide list of named faults.  Both operations are idempotent
/// set-membership updates.
pub trait FaultRegistry: Send + Sync {
    fn add_fault(&self, name: &str);
    fn remove_fault(&self, name: &str);
    fn has_fault(&self, name: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the monitor configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Load the stored config, or [`MonitorConfig::default()`] if none exists.
    fn load(&self) -> Result<MonitorConfig, ConfigError>;

    /// Validate and persist.
    fn save(&self, config: &MonitorConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// The set of driven adapters the ingestion thread owns.
pub struct MonitorPorts {
    pub notifier: Box<dyn NotificationPort + Send>,
    pub trigger: Box<dyn TriggerPort + Send>,
    pub clock: Box<dyn ClockPort + Send>,
    pub faults: Arc<dyn FaultRegistry>,
    pub events: Box<dyn EventSink + Send>,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed to deserialize.
    Corrupted(String),
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError(String),
}

/// Errors from the outbound ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The collaborator is not reachable.
    Unavailable(&'static str),
    /// The collaborator rejected the request.
    Rejected(String),
    /// Transport-level failure.
    Io(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl core::fmt::Display for PortError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable(what) => write!(f, "{} unavailable", what),
            Self::Rejected(msg) => write!(f, "rejected: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for PortError {}

//! Monitor service: the hexagonal core.
//!
//! [`MonitorService`] owns the hysteresis FSM, the connection health
//! tracker, and the alert dispatcher.  It turns one telemetry frame into
//! state updates and (at most) one alert.  All I/O flows through the port
//! bundle passed in by the caller.
//!
//! ```text
//!            ┌──────────────────────────────────┐ ──▶ FaultRegistry
//!  Frame ──▶ │          MonitorService          │ ──▶ NotificationPort
//!            │  Health · Decoder · FSM · Alert  │ ──▶ TriggerPort
//!            └──────────────────────────────────┘ ──▶ EventSink
//! ```
//!
//! ## Error policy
//!
//! | Condition                                  | Outcome              |
//! |--------------------------------------------|----------------------|
//! | field missing from frame                   | `NoSample`, silent   |
//! | wrong-shaped node on the way to a field    | `Skipped`, warning   |
//! | payload not a byte array, or too short     | `Err`, loop stops    |
//! | invalid thresholds, trigger failure        | `Err`, loop stops    |

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::fsm::{HysteresisFsm, MonitorState, Thresholds, Transition};
use crate::health::ConnectionHealthTracker;
use crate::sensors::{Frame, decode_sample};

use super::dispatcher::AlertDispatcher;
use super::events::{AlertEvent, AppEvent, StatusSnapshot};
use super::ports::MonitorPorts;

// ───────────────────────────────────────────────────────────────
// Shared status
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StatusInner {
    snapshot: StatusSnapshot,
    connected: bool,
    running: bool,
}

/// Last-known readings, written by the ingestion thread and read by the
/// command handler.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<Mutex<StatusInner>>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().snapshot
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// One-line human summary for the host's module list.
    pub fn message(&self) -> String {
        let inner = self.lock();
        let base = if inner.running { "Running" } else { "Stopped" };
        let link = if inner.connected {
            " (connected)"
        } else {
            " (connecting...)"
        };
        format!("{base}{link}")
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.lock().running = running;
    }

    fn record(&self, voltage: f64, state: MonitorState) {
        self.lock().snapshot = StatusSnapshot {
            curr_voltage: voltage,
            curr_state: state,
        };
    }

    fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// MonitorService
// ───────────────────────────────────────────────────────────────

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// The frame carried no sample for the configured channel.
    NoSample,
    /// The frame was malformed and dropped.
    Skipped,
    /// A sample was classified.
    Classified(Transition),
}

pub struct MonitorService {
    fsm: HysteresisFsm,
    health: ConnectionHealthTracker,
    dispatcher: AlertDispatcher,
    status: SharedStatus,
    skipped: u64,
}

impl MonitorService {
    pub fn new(status: SharedStatus) -> Self {
        Self {
            fsm: HysteresisFsm::new(),
            health: ConnectionHealthTracker::new(),
            dispatcher: AlertDispatcher::new(),
            status,
            skipped: 0,
        }
    }

    // ── Per-frame orchestration ───────────────────────────────

    /// Route one frame: connection state → payload → decode → FSM → alert.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        reader_id: &str,
        config: &MonitorConfig,
        ports: &mut MonitorPorts,
    ) -> Result<FrameOutcome> {
        // 1. Connection health
        match frame.connection_label(reader_id) {
            Ok(Some(label)) => self.observe_connection(label, ports),
            Ok(None) => {}
            Err(e) => return Ok(self.skip(&e)),
        }

        // 2. Sample payload
        let payload = match frame.sample_bytes(reader_id, &config.stream, &config.channel) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(FrameOutcome::NoSample),
            Err(e) if e.is_payload() => return Err(e.into()),
            Err(e) => return Ok(self.skip(&e)),
        };

        // 3. Decode
        let voltage = decode_sample(&payload)?;

        // 4. Classify and alert
        self.process_sample(voltage, config, ports)
            .map(FrameOutcome::Classified)
    }

    /// Feed one decoded voltage through the FSM and dispatch any alert.
    pub fn process_sample(
        &mut self,
        voltage: f64,
        config: &MonitorConfig,
        ports: &mut MonitorPorts,
    ) -> Result<Transition> {
        let thresholds = Thresholds::from_config(config)?;
        let prev = self.fsm.state();
        let t = self.fsm.advance(voltage, &thresholds);
        self.status.record(voltage, t.next);

        if t.next != prev {
            ports.events.emit(&AppEvent::StateChanged {
                from: prev,
                to: t.next,
                voltage,
            });
        }

        if let Some(direction) = t.alert {
            let event = AlertEvent::new(direction, config, ports.clock.now());
            let report =
                self.dispatcher
                    .dispatch(&event, ports.notifier.as_ref(), ports.trigger.as_ref())?;
            ports.events.emit(&AppEvent::AlertDispatched {
                direction,
                delivered: report.delivered,
                failed: report.failed,
            });
        }

        Ok(t)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> MonitorState {
        self.fsm.state()
    }

    pub fn is_connected(&self) -> bool {
        self.health.is_connected()
    }

    pub fn alerts_dispatched(&self) -> u64 {
        self.dispatcher.dispatched()
    }

    /// Frames dropped as malformed since startup.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    // ── Internal ──────────────────────────────────────────────

    fn observe_connection(&mut self, label: &str, ports: &mut MonitorPorts) {
        if self.health.observe(label, ports.faults.as_ref()) {
            let connected = self.health.is_connected();
            self.status.set_connected(connected);
            ports.events.emit(&AppEvent::ConnectionChanged { connected });
        }
    }

    fn skip(&mut self, reason: &dyn core::fmt::Display) -> FrameOutcome {
        self.skipped += 1;
        warn!("Frame skipped: {}", reason);
        debug!("{} frames skipped so far", self.skipped);
        FrameOutcome::Skipped
    }
}

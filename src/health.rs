//! Telemetry source liveness.
//!
//! The tracker runs on every frame that carries a `connection_state`
//! field and mirrors it into the host's shared fault list under
//! [`SOURCE_UNREACHABLE`].
//!
//! ## Fault lifecycle
//!
//! 1. A frame reports anything other than `"connected"`.
//! 2. The tracker adds the fault (a no-op if it is already listed) and
//!    marks the source disconnected.
//! 3. A later frame reports `"connected"`; the tracker removes the fault
//!    (a no-op if it is absent) and marks the source connected.
//!
//! Frames without the field leave the tracker untouched.

use log::{error, info};

use crate::app::ports::FaultRegistry;

/// Name of the fault entry owned by this tracker.
pub const SOURCE_UNREACHABLE: &str = "Telemetry source unreachable";

/// Label the telemetry source uses for a live link.
pub const CONNECTED_LABEL: &str = "connected";

/// Connection status of the telemetry source.
#[derive(Debug, Default)]
pub struct ConnectionHealthTracker {
    connected: bool,
    /// Set once any connection-state label has been seen.
    observed: bool,
}

impl ConnectionHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one connection-state label.  Returns `true` if the connected
    /// flag changed.
    pub fn observe(&mut self, label: &str, faults: &dyn FaultRegistry) -> bool {
        let connected = label == CONNECTED_LABEL;
        let changed = !self.observed || connected != self.connected;

        if connected {
            if faults.has_fault(SOURCE_UNREACHABLE) {
                info!("FAULT CLEARED: {SOURCE_UNREACHABLE}");
            }
            faults.remove_fault(SOURCE_UNREACHABLE);
        } else {
            if !faults.has_fault(SOURCE_UNREACHABLE) {
                error!("FAULT SET: {SOURCE_UNREACHABLE} (state={label})");
            }
            faults.add_fault(SOURCE_UNREACHABLE);
        }

        self.connected = connected;
        self.observed = true;
        changed
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

//! Log-backed alert outputs.
//!
//! Stand-ins for the host's SMS gateway and trigger line: they record the
//! request in the log so a bench setup shows exactly what would be sent.

use std::sync::atomic::{AtomicU64, Ordering};

use log::info;

use crate::app::ports::{NotificationPort, PortError, TriggerPort};

/// [`NotificationPort`] that logs each outgoing text.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationPort for LogNotifier {
    fn send_text(&self, recipient: &str, message: &str) -> Result<(), PortError> {
        if recipient.trim().is_empty() {
            return Err(PortError::Rejected("empty recipient".into()));
        }
        info!("SMS   | to={} | {}", recipient, message);
        Ok(())
    }
}

/// [`TriggerPort`] that logs and counts pulses.
#[derive(Debug, Default)]
pub struct LogTrigger {
    fired: AtomicU64,
}

impl LogTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }
}

impl TriggerPort for LogTrigger {
    fn fire(&self) -> Result<(), PortError> {
        let n = self.fired.fetch_add(1, Ordering::Relaxed) + 1;
        info!("TRIG  | pulse #{}", n);
        Ok(())
    }
}

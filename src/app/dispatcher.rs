//! Alert dispatch.
//!
//! Sends the timestamped alert text to every recipient, then pulses the
//! trigger output once.  A recipient that fails is logged and skipped;
//! the rest are still attempted.  A failing trigger is returned to the
//! caller.

use log::{info, warn};

use super::events::AlertEvent;
use super::ports::{NotificationPort, PortError, TriggerPort};

/// `YYYY/MM/DD HH:MM:SS ` (note the trailing space).
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S ";

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct AlertDispatcher {
    dispatched: u64,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text actually sent to recipients.
    pub fn render(event: &AlertEvent) -> String {
        format!("{}{}", event.timestamp.format(TIMESTAMP_FORMAT), event.message)
    }

    pub fn dispatch(
        &mut self,
        event: &AlertEvent,
        notifier: &dyn NotificationPort,
        trigger: &dyn TriggerPort,
    ) -> Result<DispatchReport, PortError> {
        let text = Self::render(event);
        warn!("{}", event.message);

        let mut report = DispatchReport::default();
        for recipient in &event.recipients {
            match notifier.send_text(recipient, &text) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Alert to {} failed: {}", recipient, e);
                    report.failed += 1;
                }
            }
        }

        trigger.fire()?;
        self.dispatched += 1;
        info!(
            "Alert {:?} dispatched: {} delivered, {} failed",
            event.direction, report.delivered, report.failed
        );
        Ok(report)
    }

    /// Alerts dispatched since startup.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

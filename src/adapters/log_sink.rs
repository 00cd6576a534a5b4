//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade.  A web UI push adapter would implement the same trait.

use log::{Level, log};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// Level and one-line text for `event`.
fn describe(event: &AppEvent) -> (Level, String) {
    match event {
        AppEvent::Started { reader_id } => (Level::Info, format!("START | reader={reader_id}")),
        AppEvent::StateChanged { from, to, voltage } => (
            Level::Info,
            format!("STATE | {from} -> {to} | v={voltage:.6}V"),
        ),
        AppEvent::AlertDispatched {
            direction,
            delivered,
            failed,
        } => (
            Level::Warn,
            format!("ALERT | {direction:?} | delivered={delivered} failed={failed}"),
        ),
        AppEvent::ConnectionChanged { connected } => {
            let link = if *connected { "connected" } else { "disconnected" };
            (Level::Info, format!("LINK  | {link}"))
        }
        AppEvent::Stopped { fatal: true } => (Level::Error, "STOP  | ingestion aborted".into()),
        AppEvent::Stopped { fatal: false } => (Level::Info, "STOP  | ingestion finished".into()),
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        let (level, line) = describe(event);
        log!(level, "{}", line);
    }
}

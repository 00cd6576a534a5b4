//! Recording port mocks for integration tests.
//!
//! Every mock keeps its history behind an `Arc` so the test can inspect it
//! after the port has been boxed and moved into the ingestion thread.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};
use powermon::adapters::faults::SharedFaultList;
use powermon::adapters::time::FixedClock;
use powermon::app::events::AppEvent;
use powermon::app::ports::{
    ConfigError, ConfigPort, Endpoint, EventSink, FrameSink, MonitorPorts, NotificationPort,
    PortError, StreamFilter, SubscriptionHandle, SubscriptionParams, TelemetrySource,
    TriggerPort,
};
use powermon::config::MonitorConfig;

// ── Telemetry source ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Subscribe { endpoint: String, reader_id: String },
    Unsubscribe { reader_id: String },
}

/// Hands out `R1`, `R2`, … and records every call.  Frames are pushed by
/// the test through its own clone of the queue sender.
#[derive(Default)]
pub struct MockSource {
    pub calls: Arc<Mutex<Vec<SourceCall>>>,
    pub fail_subscribe: Arc<AtomicBool>,
    /// How long `unsubscribe` blocks after recording the call.
    pub unsubscribe_delay: Duration,
    next: u32,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose `unsubscribe` takes `delay` to return.
    #[allow(dead_code)]
    pub fn slow_unsubscribe(delay: Duration) -> Self {
        Self {
            unsubscribe_delay: delay,
            ..Self::default()
        }
    }
}

impl TelemetrySource for MockSource {
    fn subscribe(
        &mut self,
        endpoint: &Endpoint,
        _filter: &StreamFilter,
        _params: &SubscriptionParams,
        _sink: FrameSink,
    ) -> Result<SubscriptionHandle, PortError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("mock source"));
        }
        self.next += 1;
        let reader_id = format!("R{}", self.next);
        self.calls.lock().unwrap().push(SourceCall::Subscribe {
            endpoint: endpoint.to_string(),
            reader_id: reader_id.clone(),
        });
        Ok(SubscriptionHandle(reader_id))
    }

    fn unsubscribe(&mut self, handle: &SubscriptionHandle) {
        self.calls.lock().unwrap().push(SourceCall::Unsubscribe {
            reader_id: handle.reader_id().to_owned(),
        });
        std::thread::sleep(self.unsubscribe_delay);
    }
}

// ── Alert outputs ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockNotifier {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl NotificationPort for MockNotifier {
    fn send_text(&self, recipient: &str, message: &str) -> Result<(), PortError> {
        if recipient.starts_with("bad") {
            return Err(PortError::Rejected(recipient.to_owned()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_owned(), message.to_owned()));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockTrigger {
    pub fired: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockTrigger {
    pub fn count(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl TriggerPort for MockTrigger {
    fn fire(&self) -> Result<(), PortError> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Io("trigger line stuck".into()));
        }
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingEvents {
    pub events: Arc<Mutex<Vec<AppEvent>>>,
}

impl EventSink for RecordingEvents {
    fn emit(&mut self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Config store ──────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub saved: Arc<Mutex<Option<MonitorConfig>>>,
}

impl ConfigPort for MemoryStore {
    fn load(&self) -> Result<MonitorConfig, ConfigError> {
        Ok(self.saved.lock().unwrap().clone().unwrap_or_default())
    }

    fn save(&self, config: &MonitorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.saved.lock().unwrap() = Some(config.clone());
        Ok(())
    }
}

// ── Bundle ────────────────────────────────────────────────────

/// Handles to everything a test may want to inspect.
#[allow(dead_code)]
pub struct Recorders {
    pub notifier: MockNotifier,
    pub trigger: MockTrigger,
    pub faults: Arc<SharedFaultList>,
    pub events: RecordingEvents,
}

pub fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap()
}

pub fn mock_ports() -> (MonitorPorts, Recorders) {
    let rec = Recorders {
        notifier: MockNotifier::default(),
        trigger: MockTrigger::default(),
        faults: Arc::new(SharedFaultList::new()),
        events: RecordingEvents::default(),
    };
    let ports = MonitorPorts {
        notifier: Box::new(rec.notifier.clone()),
        trigger: Box::new(rec.trigger.clone()),
        clock: Box::new(FixedClock(fixed_time())),
        faults: rec.faults.clone(),
        events: Box::new(rec.events.clone()),
    };
    (ports, rec)
}

/// Poll `cond` until it holds or five seconds pass.
#[allow(dead_code)]
pub fn wait_until(cond: impl FnMut() -> bool) -> bool {
    wait_within(Duration::from_secs(5), cond)
}

/// Poll `cond` until it holds or `limit` passes.
#[allow(dead_code)]
pub fn wait_within(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

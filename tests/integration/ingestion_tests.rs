//! Integration tests for the ingestion loop: queue → service → ports.
//!
//! Each test runs a real `IngestionLoop` on its own thread against the
//! recording mocks and feeds frames through the bounded queue.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::Sender;
use powermon::app::events::AppEvent;
use powermon::app::ports::FaultRegistry;
use powermon::app::service::{MonitorService, SharedStatus};
use powermon::config::{MonitorConfig, SharedConfig};
use powermon::error::{DecodeError, Error, FrameError};
use powermon::fsm::MonitorState;
use powermon::health::SOURCE_UNREACHABLE;
use powermon::ingest::{IngestionLoop, LoopExit, ShutdownSignal, SubscriptionManager, frame_queue};
use powermon::sensors::Frame;

use super::mock_ports::{MockSource, Recorders, SourceCall, mock_ports, wait_until, wait_within};

struct Harness {
    tx: Sender<Frame>,
    calls: Arc<Mutex<Vec<SourceCall>>>,
    rec: Recorders,
    status: SharedStatus,
    shutdown: ShutdownSignal,
    subscription: Arc<SubscriptionManager<MockSource>>,
    thread: JoinHandle<LoopExit>,
}

impl Harness {
    fn start(config: MonitorConfig) -> Self {
        Self::start_with(config, MockSource::new())
    }

    fn start_with(config: MonitorConfig, source: MockSource) -> Self {
        let calls = source.calls.clone();
        let (tx, rx) = frame_queue();
        let subscription = Arc::new(SubscriptionManager::new(source, tx.clone()));
        let (ports, rec) = mock_ports();
        let status = SharedStatus::new();
        let shutdown = ShutdownSignal::new();

        let thread = IngestionLoop::new(
            MonitorService::new(status.clone()),
            ports,
            SharedConfig::new(config),
            subscription.clone(),
            rx,
            shutdown.clone(),
        )
        .with_poll_interval(Duration::from_millis(10))
        .spawn()
        .unwrap();

        Self {
            tx,
            calls,
            rec,
            status,
            shutdown,
            subscription,
            thread,
        }
    }

    fn feed(&self, reader: &str, volts: &[f64]) {
        for v in volts {
            let raw = (v * 1e6).round() as i32;
            self.tx
                .send(Frame::samples(reader, "main", "ch1", &raw.to_le_bytes()))
                .unwrap();
        }
    }

    fn wait_for_state(&self, state: MonitorState) {
        assert!(
            wait_until(|| self.status.snapshot().curr_state == state),
            "never reached {state}, stuck at {}",
            self.status.snapshot().curr_state
        );
    }

    fn stop(self) -> (LoopExit, Recorders, Vec<SourceCall>) {
        self.shutdown.trigger();
        let exit = self.thread.join().unwrap();
        let calls = self.calls.lock().unwrap().clone();
        (exit, self.rec, calls)
    }
}

fn config() -> MonitorConfig {
    let mut cfg = MonitorConfig {
        threshold: 3.5,
        hysteresis: 0.5,
        ..Default::default()
    };
    cfg.recipients.push("+100".into()).unwrap();
    cfg.recipients.push(String::new()).unwrap();
    cfg.recipients.push("bad-1".into()).unwrap();
    cfg
}

fn transitions(events: &[AppEvent]) -> Vec<(MonitorState, MonitorState)> {
    events
        .iter()
        .filter_map(|e| match e {
            AppEvent::StateChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

// ── Hysteresis scenarios ─────────────────────────────────────

#[test]
fn single_crossings_never_alert() {
    let h = Harness::start(config());
    h.feed("R1", &[3.5, 2.5, 4.5, 2.5]);
    h.wait_for_state(MonitorState::LowPending);

    let (exit, rec, _) = h.stop();
    assert!(matches!(exit, LoopExit::Shutdown));
    assert_eq!(rec.trigger.count(), 0);
    assert!(rec.notifier.sent.lock().unwrap().is_empty());
    assert_eq!(
        transitions(&rec.events.events.lock().unwrap()),
        [
            (MonitorState::Unknown, MonitorState::Low),
            (MonitorState::Low, MonitorState::HighPending),
            (MonitorState::HighPending, MonitorState::LowPending),
        ]
    );
}

#[test]
fn confirmed_rise_alerts_once() {
    let h = Harness::start(config());
    h.feed("R1", &[3.5, 2.5, 4.5, 4.5]);
    h.wait_for_state(MonitorState::High);
    assert!(wait_until(|| h.rec.trigger.count() == 1));

    let (_, rec, _) = h.stop();
    assert_eq!(rec.trigger.count(), 1);
    assert_eq!(
        *rec.notifier.sent.lock().unwrap(),
        [(
            "+100".to_string(),
            "2024/01/02 03:04:05 Voltage raised above threshold".to_string()
        )]
    );
    let events = rec.events.events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::AlertDispatched {
            delivered: 1,
            failed: 1,
            ..
        }
    )));
}

#[test]
fn frames_for_other_readers_are_ignored() {
    let h = Harness::start(config());
    h.feed("R9", &[4.5]);
    h.feed("R1", &[2.5]);
    h.wait_for_state(MonitorState::Low);
    let (_, rec, _) = h.stop();
    assert_eq!(
        transitions(&rec.events.events.lock().unwrap()),
        [(MonitorState::Unknown, MonitorState::Low)]
    );
}

#[test]
fn wrong_shaped_containers_do_not_stop_the_loop() {
    let h = Harness::start(config());
    h.tx.send(Frame::from_json(r#"{"R1":{"streams":"main"}}"#).unwrap())
        .unwrap();
    h.tx.send(Frame::from_json(r#"{"R1":{"streams":{"main":{"samples":[1,2]}}}}"#).unwrap())
        .unwrap();
    h.tx.send(Frame::from_json(r#"{"R1":{"connection_state":7}}"#).unwrap())
        .unwrap();
    h.feed("R1", &[2.5]);
    h.wait_for_state(MonitorState::Low);
    let (exit, _, _) = h.stop();
    assert!(matches!(exit, LoopExit::Shutdown));
}

#[test]
fn short_payload_stops_and_unsubscribes() {
    let h = Harness::start(config());
    h.feed("R1", &[2.5]);
    h.tx.send(Frame::samples("R1", "main", "ch1", &[1, 2])).unwrap();

    let exit = h.thread.join().unwrap();
    assert!(matches!(
        exit,
        LoopExit::Fatal(Error::Decode(DecodeError::ShortPayload { len: 2 }))
    ));
    assert!(!h.status.is_running());
    assert_eq!(h.status.snapshot().curr_state, MonitorState::Low);
    assert_eq!(
        h.calls.lock().unwrap().last(),
        Some(&SourceCall::Unsubscribe {
            reader_id: "R1".into()
        })
    );
    assert!(matches!(
        h.rec.events.events.lock().unwrap().last(),
        Some(AppEvent::Stopped { fatal: true })
    ));
}

#[test]
fn non_byte_payload_stops_the_loop() {
    let h = Harness::start(config());
    h.tx.send(Frame::from_json(r#"{"R1":{"streams":{"main":{"samples":{"ch1":"xx"}}}}}"#).unwrap())
        .unwrap();

    let exit = h.thread.join().unwrap();
    assert!(matches!(
        exit,
        LoopExit::Fatal(Error::Frame(FrameError::PayloadNotBytes))
    ));
    assert_eq!(
        h.calls.lock().unwrap().last(),
        Some(&SourceCall::Unsubscribe {
            reader_id: "R1".into()
        })
    );
}

#[test]
fn sample_with_non_string_connection_state_is_dropped() {
    let h = Harness::start(config());
    let raw = (2.5f64 * 1e6).round() as i32;
    let mut frame = Frame::new();
    frame.insert(
        "R1",
        serde_json::json!({
            "connection_state": 1,
            "streams": {"main": {"samples": {"ch1": raw.to_le_bytes()}}}
        }),
    );
    h.tx.send(frame).unwrap();
    // Had the 2.5 V sample been classified, 4.5 V would only reach HighPending.
    h.feed("R1", &[4.5]);
    h.wait_for_state(MonitorState::High);

    let (exit, rec, _) = h.stop();
    assert!(matches!(exit, LoopExit::Shutdown));
    assert_eq!(
        transitions(&rec.events.events.lock().unwrap()),
        [(MonitorState::Unknown, MonitorState::High)]
    );
    assert!(rec.faults.list().is_empty());
}

// ── Connection health ────────────────────────────────────────

#[test]
fn connection_state_toggles_fault() {
    let h = Harness::start(config());

    h.tx.send(Frame::connection_state("R1", "disconnected")).unwrap();
    assert!(wait_until(|| h.rec.faults.has_fault(SOURCE_UNREACHABLE)));
    assert!(!h.status.is_connected());

    h.tx.send(Frame::connection_state("R1", "connected")).unwrap();
    assert!(wait_until(|| !h.rec.faults.has_fault(SOURCE_UNREACHABLE)));
    assert!(wait_until(|| h.status.is_connected()));

    let (_, rec, _) = h.stop();
    assert!(rec.faults.list().is_empty());
}

// ── Lifecycle ────────────────────────────────────────────────

#[test]
fn shutdown_unsubscribes() {
    let h = Harness::start(config());
    assert!(wait_until(|| h.status.is_running()));
    let status = h.status.clone();

    let (exit, rec, calls) = h.stop();
    assert!(matches!(exit, LoopExit::Shutdown));
    assert!(!status.is_running());
    assert_eq!(
        calls,
        [
            SourceCall::Subscribe {
                endpoint: "localhost:10000".into(),
                reader_id: "R1".into()
            },
            SourceCall::Unsubscribe {
                reader_id: "R1".into()
            },
        ]
    );
    let events = rec.events.events.lock().unwrap();
    assert!(matches!(events.first(), Some(AppEvent::Started { .. })));
    assert!(matches!(
        events.last(),
        Some(AppEvent::Stopped { fatal: false })
    ));
}

#[test]
fn trigger_failure_stops_and_unsubscribes() {
    let h = Harness::start(config());
    h.rec
        .trigger
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);
    h.feed("R1", &[2.5, 4.5, 4.5]);

    let exit = h.thread.join().unwrap();
    assert!(matches!(exit, LoopExit::Fatal(_)));
    assert!(!h.status.is_running());
    assert_eq!(h.rec.trigger.count(), 1);
    assert_eq!(
        h.calls.lock().unwrap().last(),
        Some(&SourceCall::Unsubscribe {
            reader_id: "R1".into()
        })
    );
    assert!(matches!(
        h.rec.events.events.lock().unwrap().last(),
        Some(AppEvent::Stopped { fatal: true })
    ));
}

#[test]
fn frames_keep_flowing_during_slow_resubscribe() {
    let source = MockSource::slow_unsubscribe(Duration::from_millis(1500));
    let h = Harness::start_with(config(), source);
    assert!(wait_until(|| h.status.is_running()));

    let moved = MonitorConfig {
        port: "10001".into(),
        ..config()
    };
    let subscription = h.subscription.clone();
    let resubscribe = std::thread::spawn(move || subscription.resubscribe(&moved));
    assert!(wait_until(|| h.calls.lock().unwrap().len() == 2));

    // The old reader is still current while its unsubscribe is in flight.
    h.feed("R1", &[2.5]);
    assert!(
        wait_within(Duration::from_millis(500), || {
            h.status.snapshot().curr_state == MonitorState::Low
        }),
        "frame was not processed while the resubscribe was running"
    );
    assert!(!resubscribe.is_finished());

    let handle = resubscribe.join().unwrap().unwrap().unwrap();
    assert_eq!(handle.reader_id(), "R2");
    h.feed("R2", &[4.5]);
    h.wait_for_state(MonitorState::HighPending);

    let (exit, _, calls) = h.stop();
    assert!(matches!(exit, LoopExit::Shutdown));
    assert_eq!(
        calls[..3],
        [
            SourceCall::Subscribe {
                endpoint: "localhost:10000".into(),
                reader_id: "R1".into()
            },
            SourceCall::Unsubscribe {
                reader_id: "R1".into()
            },
            SourceCall::Subscribe {
                endpoint: "localhost:10001".into(),
                reader_id: "R2".into()
            },
        ]
    );
}

#[test]
fn subscribe_failure_is_fatal() {
    let source = MockSource::new();
    source
        .fail_subscribe
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let h = Harness::start_with(config(), source);
    let exit = h.thread.join().unwrap();
    assert!(matches!(exit, LoopExit::Fatal(_)));
    assert!(h.calls.lock().unwrap().is_empty());
}

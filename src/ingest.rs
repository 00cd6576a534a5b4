//! Ingestion loop and telemetry subscription lifecycle.
//!
//! ```text
//! ┌────────────────┐  Frame   ┌──────────────┐  recv_timeout(1 s)  ┌────────────────┐
//! │TelemetrySource │────────▶│ bounded(100) │────────────────────▶│ IngestionLoop  │
//! │ (own thread)   │ blocks   │ frame queue  │                     │ MonitorService │
//! └────────────────┘ when full└──────────────┘                     └────────────────┘
//!         ▲                                                                 │
//!         └──────── SubscriptionManager (shared with command handler) ◀─────┘
//! ```
//!
//! The loop wakes at least once per poll interval to check the shutdown
//! signal.  A fatal processing error stops the loop; either way it
//! unsubscribes before returning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info};

use crate::app::events::AppEvent;
use crate::app::ports::{
    FrameSink, MonitorPorts, PortError, SubscriptionHandle, SubscriptionParams, TelemetrySource,
};
use crate::app::service::MonitorService;
use crate::config::{MonitorConfig, SharedConfig};
use crate::error::Error;
use crate::sensors::Frame;

/// Frame queue depth.  A full queue blocks the telemetry source.
pub const FRAME_QUEUE_CAPACITY: usize = 100;

/// Upper bound on how long the loop waits for a frame before re-checking
/// the shutdown signal.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Create the bounded frame queue.
pub fn frame_queue() -> (Sender<Frame>, Receiver<Frame>) {
    crossbeam::channel::bounded(FRAME_QUEUE_CAPACITY)
}

// ───────────────────────────────────────────────────────────────
// Shutdown signal
// ───────────────────────────────────────────────────────────────

/// Cloneable one-way stop flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// Subscription manager
// ───────────────────────────────────────────────────────────────

struct SubscriptionState<S> {
    source: S,
    handle: Option<SubscriptionHandle>,
}

/// Owns the telemetry source and the current subscription.
///
/// Shared between the ingestion thread (open/close, reader id lookup) and
/// the command handler (resubscribe on endpoint change).  The reader id
/// lives behind its own lock so per-frame lookups never wait on a slow
/// subscribe or unsubscribe.
pub struct SubscriptionManager<S: TelemetrySource> {
    state: Mutex<SubscriptionState<S>>,
    reader: RwLock<Option<String>>,
    sink: FrameSink,
    params: SubscriptionParams,
}

impl<S: TelemetrySource> SubscriptionManager<S> {
    pub fn new(source: S, sink: FrameSink) -> Self {
        Self::with_params(source, sink, SubscriptionParams::default())
    }

    pub fn with_params(source: S, sink: FrameSink, params: SubscriptionParams) -> Self {
        Self {
            state: Mutex::new(SubscriptionState {
                source,
                handle: None,
            }),
            reader: RwLock::new(None),
            sink,
            params,
        }
    }

    /// Subscribe for `config`, replacing any existing subscription.
    pub fn open(&self, config: &MonitorConfig) -> Result<SubscriptionHandle, PortError> {
        let mut state = self.lock();
        self.reopen_locked(&mut state, config)
    }

    /// Move an active subscription to the endpoint in `config`.
    ///
    /// Returns `Ok(None)` without touching the source when nothing is
    /// subscribed (the loop picks up the new endpoint on its next start).
    pub fn resubscribe(
        &self,
        config: &MonitorConfig,
    ) -> Result<Option<SubscriptionHandle>, PortError> {
        let mut state = self.lock();
        if state.handle.is_none() {
            return Ok(None);
        }
        self.reopen_locked(&mut state, config).map(Some)
    }

    /// Drop the current subscription, if any.
    pub fn close(&self) {
        let mut state = self.lock();
        if let Some(handle) = state.handle.take() {
            self.set_reader(None);
            info!("Unsubscribing reader {}", handle.reader_id());
            state.source.unsubscribe(&handle);
        }
    }

    /// Reader id frames are keyed by, while subscribed.
    ///
    /// During a resubscribe this keeps answering with the old id until the
    /// new subscription is in place.
    pub fn reader_id(&self) -> Option<String> {
        self.reader
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.reader_id().is_some()
    }

    /// Run `f` against the underlying source (test inspection).
    pub fn with_source<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock().source)
    }

    fn reopen_locked(
        &self,
        state: &mut SubscriptionState<S>,
        config: &MonitorConfig,
    ) -> Result<SubscriptionHandle, PortError> {
        if let Some(old) = state.handle.take() {
            info!("Unsubscribing reader {}", old.reader_id());
            state.source.unsubscribe(&old);
        }
        let endpoint = config.endpoint();
        let subscribed = state.source.subscribe(
            &endpoint,
            &config.stream_filter(),
            &self.params,
            self.sink.clone(),
        );
        let handle = match subscribed {
            Ok(handle) => handle,
            Err(e) => {
                self.set_reader(None);
                return Err(e);
            }
        };
        info!("Subscribed reader {} to {}", handle.reader_id(), endpoint);
        self.set_reader(Some(handle.reader_id().to_owned()));
        state.handle = Some(handle.clone());
        Ok(handle)
    }

    fn set_reader(&self, reader: Option<String>) {
        *self.reader.write().unwrap_or_else(PoisonError::into_inner) = reader;
    }

    fn lock(&self) -> MutexGuard<'_, SubscriptionState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// Ingestion loop
// ───────────────────────────────────────────────────────────────

/// Why the loop returned.
#[derive(Debug)]
pub enum LoopExit {
    /// Shutdown signal observed.
    Shutdown,
    /// Every producer hung up.
    QueueClosed,
    /// A processing error stopped the loop.
    Fatal(Error),
}

pub struct IngestionLoop<S: TelemetrySource> {
    service: MonitorService,
    ports: MonitorPorts,
    config: SharedConfig,
    subscription: Arc<SubscriptionManager<S>>,
    frames: Receiver<Frame>,
    shutdown: ShutdownSignal,
    poll_interval: Duration,
}

impl<S: TelemetrySource> IngestionLoop<S> {
    pub fn new(
        service: MonitorService,
        ports: MonitorPorts,
        config: SharedConfig,
        subscription: Arc<SubscriptionManager<S>>,
        frames: Receiver<Frame>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            service,
            ports,
            config,
            subscription,
            frames,
            shutdown,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the frame wait (tests use a short interval).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until shutdown or a fatal error.  Always unsubscribes on return.
    pub fn run(mut self) -> LoopExit {
        let status = self.service.status().clone();
        let config = self.config.snapshot();

        let exit = match self.subscription.open(&config) {
            Ok(handle) => {
                status.set_running(true);
                self.ports.events.emit(&AppEvent::Started {
                    reader_id: handle.reader_id().to_owned(),
                });
                self.pump()
            }
            Err(e) => {
                error!("Subscribe failed: {}", e);
                LoopExit::Fatal(e.into())
            }
        };

        self.subscription.close();
        status.set_running(false);
        self.ports.events.emit(&AppEvent::Stopped {
            fatal: matches!(exit, LoopExit::Fatal(_)),
        });
        debug!("Ingestion loop exited: {:?}", exit);
        exit
    }

    /// Run on a dedicated named thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<LoopExit>>
    where
        S: Send + 'static,
    {
        std::thread::Builder::new()
            .name("powermon-ingest".into())
            .spawn(move || self.run())
    }

    fn pump(&mut self) -> LoopExit {
        loop {
            if self.shutdown.is_set() {
                return LoopExit::Shutdown;
            }

            let frame = match self.frames.recv_timeout(self.poll_interval) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return LoopExit::QueueClosed,
            };

            // Frames still queued from a dropped subscription carry the old
            // reader id and fall through as absent.
            let Some(reader_id) = self.subscription.reader_id() else {
                continue;
            };
            let config = self.config.snapshot();

            if let Err(e) =
                self.service
                    .process_frame(&frame, &reader_id, &config, &mut self.ports)
            {
                error!("Processing failed, stopping ingestion: {}", e);
                return LoopExit::Fatal(e);
            }
        }
    }
}

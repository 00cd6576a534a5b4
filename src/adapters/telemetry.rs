//! TCP telemetry source adapter.
//!
//! Implements [`TelemetrySource`] as a client of a line-oriented telemetry
//! server.  Each subscription owns one reader thread:
//!
//! 1. Resolve `ip:port` and connect (bounded by [`CONNECT_TIMEOUT`]).
//! 2. Send a one-line JSON handshake naming the client and data classes.
//! 3. Push a `connected` frame, then forward every newline-terminated JSON
//!    packet as a frame keyed by the reader id.
//! 4. On EOF or I/O error push a `disconnected` frame and, if reconnect is
//!    enabled, retry after the configured period.
//!
//! The thread exits promptly once its subscription is dropped: socket
//! reads time out every [`READ_TIMEOUT`] and a blocked push onto a full
//! queue is retried in short slices that re-check the stop flag.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::SendTimeoutError;
use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::app::ports::{
    Endpoint, FrameSink, PortError, StreamFilter, SubscriptionHandle, SubscriptionParams,
    TelemetrySource,
};
use crate::sensors::Frame;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Slice used when waiting on a full queue or a reconnect delay.
const STOP_CHECK: Duration = Duration::from_millis(100);

/// Longest accepted packet line.
const MAX_LINE: usize = 1 << 20;

struct Reader {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Client-side telemetry transport over plain TCP.
#[derive(Default)]
pub struct TcpTelemetrySource {
    readers: HashMap<String, Reader>,
    next_id: u32,
}

impl TcpTelemetrySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live reader threads.
    pub fn active(&self) -> usize {
        self.readers.len()
    }
}

impl TelemetrySource for TcpTelemetrySource {
    fn subscribe(
        &mut self,
        endpoint: &Endpoint,
        filter: &StreamFilter,
        params: &SubscriptionParams,
        sink: FrameSink,
    ) -> Result<SubscriptionHandle, PortError> {
        let port: u16 = endpoint
            .port
            .trim()
            .parse()
            .map_err(|_| PortError::Rejected(format!("invalid port {:?}", endpoint.port)))?;

        self.next_id += 1;
        let reader_id = format!("{}-{}", params.reader_name, self.next_id);

        let session = Session {
            reader_id: reader_id.clone(),
            host: endpoint.ip.clone(),
            port,
            handshake: handshake(filter, params),
            reconnect: params.reconnect.then(|| {
                Duration::from_secs(params.reconnect_period_secs)
            }),
            sink,
            stop: Arc::new(AtomicBool::new(false)),
        };
        let stop = session.stop.clone();

        let thread = std::thread::Builder::new()
            .name(format!("telemetry-{reader_id}"))
            .spawn(move || session.run())
            .map_err(|e| PortError::Io(e.to_string()))?;

        info!("Telemetry reader {} started for {}", reader_id, endpoint);
        self.readers.insert(
            reader_id.clone(),
            Reader {
                stop,
                thread: Some(thread),
            },
        );
        Ok(SubscriptionHandle(reader_id))
    }

    fn unsubscribe(&mut self, handle: &SubscriptionHandle) {
        let Some(mut reader) = self.readers.remove(handle.reader_id()) else {
            return;
        };
        reader.stop.store(true, Ordering::Release);
        if let Some(thread) = reader.thread.take() {
            if thread.join().is_err() {
                warn!("Telemetry reader {} panicked", handle.reader_id());
            }
        }
        info!("Telemetry reader {} stopped", handle.reader_id());
    }
}

impl Drop for TcpTelemetrySource {
    fn drop(&mut self) {
        for reader in self.readers.values() {
            reader.stop.store(true, Ordering::Release);
        }
    }
}

fn handshake(filter: &StreamFilter, params: &SubscriptionParams) -> String {
    json!({
        "client_name": params.client_name,
        "subscriptions": params.subscriptions,
        "flush_buffer": params.flush_buffer,
        "stream": filter.stream,
        "channel": filter.channel,
    })
    .to_string()
}

// ───────────────────────────────────────────────────────────────
// Reader thread
// ───────────────────────────────────────────────────────────────

struct Session {
    reader_id: String,
    host: String,
    port: u16,
    handshake: String,
    reconnect: Option<Duration>,
    sink: FrameSink,
    stop: Arc<AtomicBool>,
}

/// Why a connected session ended.
enum Ended {
    Lost,
    Stopped,
}

impl Session {
    fn run(self) {
        loop {
            if self.stopped() {
                return;
            }
            match self.connect() {
                Ok(stream) => {
                    info!("{}: connected to {}:{}", self.reader_id, self.host, self.port);
                    if !self.push(Frame::connection_state(&self.reader_id, "connected")) {
                        return;
                    }
                    if let Ended::Stopped = self.read_packets(stream) {
                        return;
                    }
                    warn!("{}: connection lost", self.reader_id);
                }
                Err(e) => warn!(
                    "{}: connect to {}:{} failed: {}",
                    self.reader_id, self.host, self.port, e
                ),
            }
            if !self.push(Frame::connection_state(&self.reader_id, "disconnected")) {
                return;
            }
            let Some(period) = self.reconnect else {
                return;
            };
            if !self.sleep(period) {
                return;
            }
        }
    }

    fn connect(&self) -> std::io::Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port).to_socket_addrs()?.collect();
        let mut last = std::io::Error::new(ErrorKind::NotFound, "no address resolved");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(mut stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    stream.write_all(self.handshake.as_bytes())?;
                    stream.write_all(b"\n")?;
                    return Ok(stream);
                }
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    fn read_packets(&self, stream: TcpStream) -> Ended {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();
        loop {
            if self.stopped() {
                return Ended::Stopped;
            }
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => return Ended::Lost,
                Ok(_) if line.ends_with(b"\n") => {
                    if !self.forward(&line) {
                        return Ended::Stopped;
                    }
                    line.clear();
                }
                // Partial line at EOF.
                Ok(_) => return Ended::Lost,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if line.len() > MAX_LINE {
                        warn!("{}: oversized packet dropped", self.reader_id);
                        line.clear();
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("{}: read error: {}", self.reader_id, e);
                    return Ended::Lost;
                }
            }
        }
    }

    /// Returns false once the subscription is gone.
    fn forward(&self, line: &[u8]) -> bool {
        let text = line.trim_ascii();
        if text.is_empty() {
            return true;
        }
        match serde_json::from_slice::<Value>(text) {
            Ok(packet) => self.push(Frame::for_reader(&self.reader_id, packet)),
            Err(e) => {
                warn!("{}: unparseable packet: {}", self.reader_id, e);
                true
            }
        }
    }

    /// Blocking push that gives up once stopped or the queue is gone.
    fn push(&self, mut frame: Frame) -> bool {
        loop {
            if self.stopped() {
                return false;
            }
            match self.sink.send_timeout(frame, STOP_CHECK) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(f)) => frame = f,
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    fn sleep(&self, period: Duration) -> bool {
        let mut left = period;
        while !left.is_zero() {
            if self.stopped() {
                return false;
            }
            let step = left.min(STOP_CHECK);
            std::thread::sleep(step);
            left -= step;
        }
        !self.stopped()
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

//! Power monitor: host entry point.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                      │
//! │                                                                 │
//! │  TcpTelemetrySource  LogNotifier  LogTrigger  SystemClock       │
//! │  (TelemetrySource)   (SMS)        (Trigger)   (Clock)           │
//! │  SharedFaultList     LogEventSink JsonFileConfigStore           │
//! │                                                                 │
//! │  ──────────────── Port Trait Boundary ───────────────────       │
//! │                                                                 │
//! │  ┌───────────────────────────────────────────────────────┐      │
//! │  │ IngestionLoop ─▶ MonitorService (pure logic)           │      │
//! │  │ Health · Decoder · Hysteresis FSM · AlertDispatcher    │      │
//! │  └───────────────────────────────────────────────────────┘      │
//! │                                                                 │
//! │  stdin ─▶ MonitorControl (set_config / get_status)              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `powermon [CONFIG_PATH]`.  One JSON command per stdin line;
//! one JSON response per stdout line.  EOF or Ctrl-C stops the monitor.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};

use powermon::adapters::config_store::{DEFAULT_CONFIG_FILE, JsonFileConfigStore};
use powermon::adapters::faults::SharedFaultList;
use powermon::adapters::log_sink::LogEventSink;
use powermon::adapters::notify::{LogNotifier, LogTrigger};
use powermon::adapters::telemetry::TcpTelemetrySource;
use powermon::adapters::time::SystemClock;
use powermon::app::ports::{ConfigPort, MonitorPorts};
use powermon::app::service::{MonitorService, SharedStatus};
use powermon::config::SharedConfig;
use powermon::control::MonitorControl;
use powermon::ingest::{IngestionLoop, LoopExit, ShutdownSignal, SubscriptionManager, frame_queue};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_owned());
    let store = JsonFileConfigStore::new(&path);
    let config = store
        .load()
        .with_context(|| format!("failed to load config from '{path}'"))?;
    info!(
        "Monitoring {}/{} at {} (threshold {} V, hysteresis {} V)",
        config.stream,
        config.channel,
        config.endpoint(),
        config.threshold,
        config.hysteresis
    );

    let shutdown = ShutdownSignal::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.trigger())
            .context("failed to install Ctrl-C handler")?;
    }

    let config = SharedConfig::new(config);
    let status = SharedStatus::new();
    let faults = Arc::new(SharedFaultList::new());
    let (tx, rx) = frame_queue();
    let subscription = Arc::new(SubscriptionManager::new(TcpTelemetrySource::new(), tx));

    let ports = MonitorPorts {
        notifier: Box::new(LogNotifier),
        trigger: Box::new(LogTrigger::new()),
        clock: Box::new(SystemClock),
        faults: faults.clone(),
        events: Box::new(LogEventSink::new()),
    };

    let ingest = IngestionLoop::new(
        MonitorService::new(status.clone()),
        ports,
        config.clone(),
        subscription.clone(),
        rx,
        shutdown.clone(),
    )
    .spawn()
    .context("failed to spawn ingestion thread")?;

    let control = MonitorControl::new(config, subscription, status, Box::new(store));
    {
        let shutdown = shutdown.clone();
        std::thread::Builder::new()
            .name("powermon-commands".into())
            .spawn(move || serve_commands(&control, &shutdown))
            .context("failed to spawn command thread")?;
    }

    let exit = ingest
        .join()
        .map_err(|_| anyhow::anyhow!("ingestion thread panicked"))?;

    let remaining = faults.list();
    if !remaining.is_empty() {
        warn!("Active faults at exit: {:?}", remaining);
    }

    match exit {
        LoopExit::Fatal(e) => Err(anyhow::Error::new(e).context("monitor stopped")),
        other => {
            info!("Monitor stopped: {:?}", other);
            Ok(())
        }
    }
}

/// Read JSON commands from stdin until EOF, then request shutdown.
fn serve_commands(control: &MonitorControl<TcpTelemetrySource>, shutdown: &ShutdownSignal) {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("stdin read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = control.handle_line(&line);
        let written = serde_json::to_string(&response)
            .map_err(std::io::Error::other)
            .and_then(|text| writeln!(stdout, "{text}"))
            .and_then(|()| stdout.flush());
        if let Err(e) = written {
            error!("stdout write failed: {}", e);
            break;
        }
        info!("Status: {}", control.message());
    }
    info!("Command input closed, shutting down");
    shutdown.trigger();
}

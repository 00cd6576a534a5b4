//! Operator command handler.
//!
//! Runs on its own thread, concurrently with the ingestion loop.  It never
//! touches the FSM or health tracker directly: configuration goes through
//! [`SharedConfig`], status comes back through [`SharedStatus`], and an
//! endpoint change is applied through the shared [`SubscriptionManager`]
//! before the new config is published.

use std::sync::Arc;

use log::{info, warn};

use crate::app::commands::{AppCommand, CommandError, CommandResponse};
use crate::app::events::StatusSnapshot;
use crate::app::ports::{ConfigPort, TelemetrySource};
use crate::app::service::SharedStatus;
use crate::config::{MonitorConfig, SharedConfig};
use crate::ingest::SubscriptionManager;

pub struct MonitorControl<S: TelemetrySource> {
    config: SharedConfig,
    subscription: Arc<SubscriptionManager<S>>,
    status: SharedStatus,
    store: Box<dyn ConfigPort + Send>,
}

impl<S: TelemetrySource> MonitorControl<S> {
    pub fn new(
        config: SharedConfig,
        subscription: Arc<SubscriptionManager<S>>,
        status: SharedStatus,
        store: Box<dyn ConfigPort + Send>,
    ) -> Self {
        Self {
            config,
            subscription,
            status,
            store,
        }
    }

    /// Parse and execute one JSON command line.
    pub fn handle_line(&self, line: &str) -> CommandResponse {
        match AppCommand::parse(line) {
            Ok(cmd) => self.handle_command(cmd),
            Err(e @ CommandError::Unknown(_)) => CommandResponse::err(e.to_string()),
            Err(e) => {
                warn!("{}", e);
                CommandResponse::err(e.to_string())
            }
        }
    }

    pub fn handle_command(&self, cmd: AppCommand) -> CommandResponse {
        match cmd {
            AppCommand::SetConfig { config } => match self.set_config(config) {
                Ok(()) => CommandResponse::ok(serde_json::Value::String(String::new())),
                Err(msg) => CommandResponse::err(msg),
            },
            AppCommand::GetStatus => match serde_json::to_value(self.status()) {
                Ok(v) => CommandResponse::ok(v),
                Err(e) => CommandResponse::err(e.to_string()),
            },
        }
    }

    /// Validate, resubscribe if the endpoint moved, publish, persist.
    pub fn set_config(&self, new: MonitorConfig) -> Result<(), String> {
        new.validate().map_err(|e| e.to_string())?;

        let current = self.config.snapshot();
        if current.endpoint_differs(&new) {
            info!(
                "Telemetry endpoint changed {} -> {}",
                current.endpoint(),
                new.endpoint()
            );
            self.subscription
                .resubscribe(&new)
                .map_err(|e| format!("resubscribe failed: {e}"))?;
        }

        self.config.replace(new.clone());
        info!("Configuration updated at runtime");

        if let Err(e) = self.store.save(&new) {
            warn!("Config save failed: {}", e);
        }
        Ok(())
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Host-facing one-liner, e.g. `Running (connected)`.
    pub fn message(&self) -> String {
        self.status.message()
    }
}

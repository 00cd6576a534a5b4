//! Inbound commands to the monitor.
//!
//! These arrive from the operator surface (web UI bridge, stdin) as JSON
//! objects with a `cmd` discriminator:
//!
//! ```text
//! {"cmd": "set_config", "config": { … }}
//! {"cmd": "get_status"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MonitorConfig;

/// Commands that external adapters can send into the monitor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AppCommand {
    /// Replace the active configuration.
    SetConfig { config: MonitorConfig },

    /// Report last-known voltage and state.
    GetStatus,
}

/// Reasons a command line could not be turned into an [`AppCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Well-formed object with an unrecognised `cmd`.
    Unknown(String),
    /// Not a command object at all, or bad arguments.
    Malformed(String),
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unknown(_) => write!(f, "Unknown command"),
            Self::Malformed(msg) => write!(f, "Malformed command: {}", msg),
        }
    }
}

impl AppCommand {
    const KNOWN: [&'static str; 2] = ["set_config", "get_status"];

    /// Parse one JSON command.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CommandError::Malformed(e.to_string()))?;
        let Some(cmd) = value.get("cmd").and_then(Value::as_str) else {
            return Err(CommandError::Malformed("missing \"cmd\"".into()));
        };
        if !Self::KNOWN.contains(&cmd) {
            return Err(CommandError::Unknown(cmd.to_owned()));
        }
        serde_json::from_value(value).map_err(|e| CommandError::Malformed(e.to_string()))
    }
}

/// Reply sent back to the operator surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    pub result: Value,
    pub error: bool,
}

impl CommandResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            result,
            error: false,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: Value::String(message.into()),
            error: true,
        }
    }
}

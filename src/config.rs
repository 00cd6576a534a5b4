//! Monitor configuration
//!
//! All operator-tunable parameters for the power monitor.  Loaded once at
//! startup through a [`ConfigPort`](crate::app::ports::ConfigPort) and
//! replaced atomically by the `set_config` command.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, Endpoint, StreamFilter};
use crate::fsm::Direction;

/// Maximum number of alert recipients.
pub const MAX_RECIPIENTS: usize = 3;

/// Core monitor configuration
///
/// On disk and on the wire the recipients are the three slots
/// `phone_number_1`..`phone_number_3`; a `recipients` list is accepted too
/// and wins when both are given.  Omitted fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigRepr", into = "ConfigRepr")]
pub struct MonitorConfig {
    // --- Telemetry source ---
    /// Address of the telemetry source.
    pub ip: String,
    /// Port of the telemetry source (kept as text, as entered by the operator).
    pub port: String,
    /// Stream carrying the monitored channel.
    pub stream: String,
    /// Channel within `stream` that carries the voltage.
    pub channel: String,

    // --- Hysteresis ---
    /// Centre of the dead band (volts).
    pub threshold: f64,
    /// Half-width of the dead band (volts, >= 0).
    pub hysteresis: f64,

    // --- Alerting ---
    /// Alert recipients in delivery order.  Empty entries are skipped.
    pub recipients: heapless::Vec<String, MAX_RECIPIENTS>,
    /// Text sent on a confirmed transition to Low.
    pub low_msg: String,
    /// Text sent on a confirmed transition to High.
    pub high_msg: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".into(),
            port: "10000".into(),
            stream: "main".into(),
            channel: "ch1".into(),

            threshold: 3.5,
            hysteresis: 0.5,

            recipients: heapless::Vec::new(),
            low_msg: "Voltage dropped below threshold".into(),
            high_msg: "Voltage raised above threshold".into(),
        }
    }
}

/// Serialized form of [`MonitorConfig`].
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct ConfigRepr {
    ip: String,
    port: String,
    stream: String,
    channel: String,
    threshold: f64,
    hysteresis: f64,
    phone_number_1: String,
    phone_number_2: String,
    phone_number_3: String,
    #[serde(skip_serializing)]
    recipients: Option<heapless::Vec<String, MAX_RECIPIENTS>>,
    low_msg: String,
    high_msg: String,
}

impl Default for ConfigRepr {
    fn default() -> Self {
        MonitorConfig::default().into()
    }
}

impl From<MonitorConfig> for ConfigRepr {
    fn from(c: MonitorConfig) -> Self {
        let mut slots = c.recipients.into_iter();
        let mut slot = || slots.next().unwrap_or_default();
        let (phone_number_1, phone_number_2, phone_number_3) = (slot(), slot(), slot());
        Self {
            ip: c.ip,
            port: c.port,
            stream: c.stream,
            channel: c.channel,
            threshold: c.threshold,
            hysteresis: c.hysteresis,
            phone_number_1,
            phone_number_2,
            phone_number_3,
            recipients: None,
            low_msg: c.low_msg,
            high_msg: c.high_msg,
        }
    }
}

impl From<ConfigRepr> for MonitorConfig {
    fn from(r: ConfigRepr) -> Self {
        let recipients = match r.recipients {
            Some(list) => list,
            None => [r.phone_number_1, r.phone_number_2, r.phone_number_3]
                .into_iter()
                .collect(),
        };
        Self {
            ip: r.ip,
            port: r.port,
            stream: r.stream,
            channel: r.channel,
            threshold: r.threshold,
            hysteresis: r.hysteresis,
            recipients,
            low_msg: r.low_msg,
            high_msg: r.high_msg,
        }
    }
}

impl MonitorConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            ip: self.ip.clone(),
            port: self.port.clone(),
        }
    }

    pub fn stream_filter(&self) -> StreamFilter {
        StreamFilter {
            stream: self.stream.clone(),
            channel: self.channel.clone(),
        }
    }

    /// True when switching to `other` requires a new subscription.
    pub fn endpoint_differs(&self, other: &Self) -> bool {
        self.ip != other.ip || self.port != other.port
    }

    /// Non-empty recipients, in configured order.
    pub fn active_recipients(&self) -> impl Iterator<Item = &str> {
        self.recipients
            .iter()
            .map(String::as_str)
            .filter(|r| !r.is_empty())
    }

    /// Alert text for a confirmed transition in `direction`.
    pub fn message_for(&self, direction: Direction) -> &str {
        match direction {
            Direction::Low => &self.low_msg,
            Direction::High => &self.high_msg,
        }
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ip.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("ip must not be empty"));
        }
        if self.port.trim().parse::<u16>().is_err() {
            return Err(ConfigError::ValidationFailed("port must be 0–65535"));
        }
        if self.stream.is_empty() {
            return Err(ConfigError::ValidationFailed("stream must not be empty"));
        }
        if self.channel.is_empty() {
            return Err(ConfigError::ValidationFailed("channel must not be empty"));
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::ValidationFailed("threshold must be finite"));
        }
        if !self.hysteresis.is_finite() || self.hysteresis < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "hysteresis must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Thread-safe handle to the active configuration.
///
/// The ingestion thread reads cloned snapshots; the command handler swaps
/// the whole value in one write.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<MonitorConfig>>,
}

impl SharedConfig {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn snapshot(&self) -> MonitorConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, config: MonitorConfig) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = config;
    }
}

//! Five-state hysteresis confirmation filter.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            low = threshold − hysteresis                  │
//! │            high = threshold + hysteresis                 │
//! │                                                          │
//! │   Below      │      Within (dead band)      │   Above    │
//! │ ─────────────┼──────────────────────────────┼─────────── │
//! │             low                            high          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! [`HysteresisFsm`] owns the current [`MonitorState`] and advances it one
//! sample at a time through the pure [`table::transition`] function.  The
//! state starts at `Unknown` and is never persisted.

pub mod table;

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::config::MonitorConfig;
pub use table::{Transition, transition};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Qualitative classification of the monitored voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MonitorState {
    /// No sample has left the dead band yet.
    #[default]
    Unknown,
    /// Settled low.
    Low,
    /// One sample below `low` seen since leaving High; awaiting confirmation.
    LowPending,
    /// Settled high.
    High,
    /// One sample above `high` seen since leaving Low; awaiting confirmation.
    HighPending,
}

impl MonitorState {
    pub const ALL: [Self; 5] = [
        Self::Unknown,
        Self::Low,
        Self::LowPending,
        Self::High,
        Self::HighPending,
    ];

    /// Operator-facing label.  Pending states carry a trailing `?`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Low => "Low",
            Self::LowPending => "Low?",
            Self::High => "High",
            Self::HighPending => "High?",
        }
    }
}

impl core::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction of a confirmed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Low,
    High,
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Where a sample falls relative to the dead band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Below,
    Within,
    Above,
}

/// Validated dead-band bounds.  `low <= high` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    low: f64,
    high: f64,
}

impl Thresholds {
    pub fn new(threshold: f64, hysteresis: f64) -> Result<Self, ConfigError> {
        if !threshold.is_finite() {
            return Err(ConfigError::ValidationFailed("threshold must be finite"));
        }
        if !hysteresis.is_finite() || hysteresis < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "hysteresis must be finite and >= 0",
            ));
        }
        Ok(Self {
            low: threshold - hysteresis,
            high: threshold + hysteresis,
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        Self::new(config.threshold, config.hysteresis)
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Both edges belong to the dead band.
    pub fn classify(&self, v: f64) -> Band {
        if v < self.low {
            Band::Below
        } else if v > self.high {
            Band::Above
        } else {
            Band::Within
        }
    }
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// Owns the monitor state.
#[derive(Debug, Default)]
pub struct HysteresisFsm {
    state: MonitorState,
}

impl HysteresisFsm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample.  Returns the transition that was applied.
    pub fn advance(&mut self, v: f64, thresholds: &Thresholds) -> Transition {
        let t = transition(self.state, v, thresholds);
        if t.next != self.state {
            info!("FSM transition: {} -> {} (v={:.6})", self.state, t.next, v);
        }
        self.state = t.next;
        t
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }
}

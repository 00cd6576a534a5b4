//! The hysteresis transition table as a pure function.
//!
//! ```text
//!                 v < low        low <= v <= high     v > high
//!  Unknown   ──▶  Low            Unknown              High
//!  Low       ──▶  Low            Low                  HighPending
//!  HighPend  ──▶  LowPending     HighPending          High   [fire High]
//!  High      ──▶  LowPending     High                 High
//!  LowPend   ──▶  Low [fire Low] LowPending           HighPending
//! ```
//!
//! A settled state only leaves for the *pending* state of the opposite
//! extreme.  A pending state needs one more sample in the same outer band
//! to commit and fire; a sample in the other outer band flips to the other
//! pending state without firing.

use super::{Band, Direction, MonitorState, Thresholds};

/// Result of feeding one sample through the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: MonitorState,
    /// Set only on a confirmed transition.
    pub alert: Option<Direction>,
}

impl Transition {
    const fn to(next: MonitorState) -> Self {
        Self { next, alert: None }
    }

    const fn confirm(next: MonitorState, direction: Direction) -> Self {
        Self {
            next,
            alert: Some(direction),
        }
    }
}

/// Successor state and optional alert for `state` observing `v`.
pub fn transition(state: MonitorState, v: f64, thresholds: &Thresholds) -> Transition {
    use Band::{Above, Below, Within};
    use MonitorState::{High, HighPending, Low, LowPending, Unknown};

    match (state, thresholds.classify(v)) {
        (Unknown, Below) => Transition::to(Low),
        (Unknown, Within) => Transition::to(Unknown),
        (Unknown, Above) => Transition::to(High),

        (Low, Below | Within) => Transition::to(Low),
        (Low, Above) => Transition::to(HighPending),

        (HighPending, Below) => Transition::to(LowPending),
        (HighPending, Within) => Transition::to(HighPending),
        (HighPending, Above) => Transition::confirm(High, Direction::High),

        (High, Below) => Transition::to(LowPending),
        (High, Within | Above) => Transition::to(High),

        (LowPending, Below) => Transition::confirm(Low, Direction::Low),
        (LowPending, Within) => Transition::to(LowPending),
        (LowPending, Above) => Transition::to(HighPending),
    }
}

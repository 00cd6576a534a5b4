//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `config_store` | ConfigPort         | JSON file on disk            |
//! | `faults`       | FaultRegistry      | In-process fault list        |
//! | `log_sink`     | EventSink          | `log` facade                 |
//! | `notify`       | NotificationPort   | `log` facade (SMS stand-in)  |
//! |                | TriggerPort        | `log` facade + pulse counter |
//! | `telemetry`    | TelemetrySource    | Line-delimited JSON over TCP |
//! | `time`         | ClockPort          | Local wall clock             |

pub mod config_store;
pub mod faults;
pub mod log_sink;
pub mod notify;
pub mod telemetry;
pub mod time;

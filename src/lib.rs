//! Power monitor library.
//!
//! Watches a single voltage channel on a streaming telemetry source and
//! raises an alert (text messages plus a trigger pulse) whenever the
//! voltage crosses a threshold and is confirmed on the far side of a
//! hysteresis band.  Exposes every layer for integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod health;
pub mod ingest;
pub mod sensors;

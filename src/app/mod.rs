//! Application core: pure domain logic, zero I/O.
//!
//! The monitor's business rules live here: frame processing, hysteresis
//! orchestration, alert dispatch, and the operator command set.  All
//! interaction with the transport, SMS gateway, trigger line and fault list
//! happens through **port traits** defined in [`ports`], so this layer is
//! fully testable with recording mocks.

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod service;

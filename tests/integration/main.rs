//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the recording mocks in `mock_ports`.  No network access needed.

mod ingestion_tests;
mod mock_ports;

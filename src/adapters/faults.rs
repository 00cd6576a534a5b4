//! In-process fault list.
//!
//! The host process keeps one ordered list of human-readable fault names
//! that every module appends to and removes from.  Entries are unique.

use std::sync::{Mutex, PoisonError};

use crate::app::ports::FaultRegistry;

#[derive(Debug, Default)]
pub struct SharedFaultList {
    faults: Mutex<Vec<String>>,
}

impl SharedFaultList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current faults in insertion order.
    pub fn list(&self) -> Vec<String> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FaultRegistry for SharedFaultList {
    fn add_fault(&self, name: &str) {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if !faults.iter().any(|f| f == name) {
            faults.push(name.to_owned());
        }
    }

    fn remove_fault(&self, name: &str) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|f| f != name);
    }

    fn has_fault(&self, name: &str) -> bool {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|f| f == name)
    }
}

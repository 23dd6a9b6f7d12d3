//! String-keyed dynamic capability table
//!
//! Components inject query operations (e.g. `get_position`) that peers
//! call without static coupling. Arguments and replies travel as JSON
//! values.

use anyhow::{Result, anyhow};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A dynamically dispatched query operation
pub type Capability = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Registry of injected capabilities
#[derive(Default)]
pub struct CapabilityTable {
    entries: RwLock<FxHashMap<String, Capability>>,
}

impl CapabilityTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under `name`, replacing any previous one
    pub fn inject(&self, name: &str, capability: Capability) {
        debug!(name, "capability injected");
        self.entries.write().insert(name.to_string(), capability);
    }

    /// Remove a capability
    pub fn remove(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }

    /// Invoke a capability by name
    ///
    /// The lock is dropped before the function runs so capabilities may
    /// call back into the table.
    pub fn call(&self, name: &str, args: Value) -> Result<Value> {
        let capability = self
            .entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("no such capability: {name}"))?;
        capability(args)
    }

    /// Names currently registered
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

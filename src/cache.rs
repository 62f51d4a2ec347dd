//! Latest-result cache
//!
//! Holds one slot per registered check. A slot is `None` until the check has
//! run once, and afterwards always holds the most recent result. Slots are
//! never removed.
//!
//! Results are stored as `Arc<CheckResult>`, so an update swaps a whole value
//! and readers either see the previous result or the new one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::trace;

use crate::{
    CheckResult,
    error::{MonitorError, MonitorResult},
};

/// A single cache slot as seen by readers
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub name: String,

    /// `None` if the check has not run yet
    pub result: Option<Arc<CheckResult>>,
}

#[derive(Debug, Default)]
struct Slots {
    /// Registration order
    order: Vec<String>,
    results: HashMap<String, Option<Arc<CheckResult>>>,
}

#[derive(Debug, Default)]
pub struct ResultCache {
    slots: RwLock<Slots>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the "not yet run" slot for a check.
    pub async fn register(&self, name: &str) -> MonitorResult<()> {
        if name.trim().is_empty() {
            return Err(MonitorError::EmptyCheckName);
        }

        let mut slots = self.slots.write().await;
        if slots.results.contains_key(name) {
            return Err(MonitorError::DuplicateCheck(name.to_string()));
        }

        slots.order.push(name.to_string());
        slots.results.insert(name.to_string(), None);
        trace!("registered cache slot for {name}");
        Ok(())
    }

    /// Replace the latest result of a registered check.
    pub async fn put(&self, name: &str, result: Arc<CheckResult>) -> MonitorResult<()> {
        let mut slots = self.slots.write().await;
        let Some(slot) = slots.results.get_mut(name) else {
            return Err(MonitorError::UnregisteredCheck(name.to_string()));
        };

        *slot = Some(result);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<Arc<CheckResult>> {
        let slots = self.slots.read().await;
        slots.results.get(name).cloned().flatten()
    }

    /// Point-in-time view of all slots, in registration order.
    pub async fn snapshot(&self) -> Vec<CacheEntry> {
        let slots = self.slots.read().await;
        slots
            .order
            .iter()
            .map(|name| CacheEntry {
                name: name.clone(),
                result: slots.results.get(name).cloned().flatten(),
            })
            .collect()
    }

    pub async fn names(&self) -> Vec<String> {
        self.slots.read().await.order.clone()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

//! Named exclusive-operation locks.
//!
//! A `LockRegistry` tracks which named operations are currently running.
//! Acquisition never blocks: a caller that finds the name taken is expected
//! to skip its work. The registry is an ordinary value shared by `Arc`, so
//! each test (or each embedding application) owns its own set of locks.

use crate::error::{Result, ScenedexError};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

/// Lock name shared by every operation that writes to the scene index.
pub const INDEX_LOCK: &str = "index";

/// A lock currently held in a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldLock {
    pub name: String,
    pub acquired_at: DateTime<Utc>,
}

/// Registry of held named locks.
#[derive(Debug, Default)]
pub struct LockRegistry {
    held: DashMap<String, DateTime<Utc>>,
}

impl LockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        LockRegistry {
            held: DashMap::new(),
        }
    }

    /// Take the named lock if it is free.
    ///
    /// Returns true iff this call acquired the lock.
    pub fn try_acquire(&self, name: &str) -> bool {
        match self.held.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                debug!(lock = name, "Lock acquired");
                true
            }
        }
    }

    /// Release the named lock. Releasing a free lock is a no-op.
    pub fn release(&self, name: &str) {
        if self.held.remove(name).is_some() {
            debug!(lock = name, "Lock released");
        } else {
            warn!(lock = name, "Released a lock that was not held");
        }
    }

    /// Check whether the named lock is currently held.
    pub fn is_held(&self, name: &str) -> bool {
        self.held.contains_key(name)
    }

    /// List all held locks.
    pub fn held(&self) -> Vec<HeldLock> {
        let mut locks: Vec<HeldLock> = self
            .held
            .iter()
            .map(|entry| HeldLock {
                name: entry.key().clone(),
                acquired_at: *entry.value(),
            })
            .collect();
        locks.sort_by(|a, b| a.name.cmp(&b.name));
        locks
    }

    /// Acquire the named lock as a guard that releases it on drop.
    ///
    /// Fails with `LockContention` if the lock is already held.
    pub fn acquire(&self, name: &str) -> Result<LockGuard<'_>> {
        if self.try_acquire(name) {
            Ok(LockGuard {
                registry: self,
                name: name.to_string(),
            })
        } else {
            Err(ScenedexError::LockContention {
                name: name.to_string(),
            })
        }
    }
}

/// Holds a named lock until dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    registry: &'a LockRegistry,
    name: String,
}

impl LockGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.name);
    }
}

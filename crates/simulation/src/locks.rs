//! Per-key single-flight registry.

use crate::error::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Keys with a simulation in flight. Cloning shares the registry.
#[derive(Clone, Debug, Default)]
pub struct KeyLocks {
    inner: Arc<DashMap<String, ()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key` until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::SimulationInProgress`] if another guard holds `key`.
    pub fn try_acquire(&self, key: &str) -> Result<KeyGuard> {
        match self.inner.entry(key.to_string()) {
            Entry::Occupied(_) => Err(Error::SimulationInProgress(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(());
                debug!(key, "key lock acquired");
                Ok(KeyGuard {
                    key: key.to_string(),
                    registry: Arc::clone(&self.inner),
                })
            }
        }
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    registry: Arc<DashMap<String, ()>>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.key);
        debug!(key = %self.key, "key lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_drop() {
        let locks = KeyLocks::new();
        let guard = locks.try_acquire("bird_01").unwrap();
        assert!(locks.is_locked("bird_01"));
        assert_eq!(
            locks.try_acquire("bird_01").unwrap_err(),
            Error::SimulationInProgress("bird_01".into())
        );

        let other = locks.clone().try_acquire("bird_02").unwrap();
        assert_eq!(locks.len(), 2);

        drop(guard);
        drop(other);
        assert!(locks.is_empty());
        assert!(locks.try_acquire("bird_01").is_ok());
    }
}

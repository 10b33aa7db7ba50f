//! In-memory [`StorageArea`] for tests and hosts without persistent storage.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};

use super::StorageArea;

/// Volatile key/value area.
///
/// An optional byte limit emulates the host's own storage quota: `set_item`
/// fails once the sum of key and value lengths would exceed it, the way
/// `localStorage.setItem` throws `QuotaExceededError`.
#[derive(Default)]
pub struct InMemoryArea {
    map: Mutex<HashMap<String, String>>,
    limit: Option<usize>,
}

impl InMemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
            limit: Some(limit),
        }
    }

    pub fn len(&self) -> usize {
        self.map.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageArea for InMemoryArea {
    fn get_item(&self, key: &str) -> Option<String> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| anyhow::anyhow!("storage area lock poisoned"))?;
        if let Some(limit) = self.limit {
            let others: usize = map
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > limit {
                bail!("storage area quota exceeded ({} bytes)", limit);
            }
        }
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.map
            .lock()
            .map_err(|_| anyhow::anyhow!("storage area lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

//! In-memory shared store

use super::SharedStore;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Process-local store keyed by namespace
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all namespaces, expired ones included
    pub fn len(&self) -> usize {
        self.data.read().values().map(|ns| ns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SharedStore for MemoryStore {
    fn set(&self, namespace: &str, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        if namespace.is_empty() || key.is_empty() {
            return Err(Error::Storage("namespace and key required".to_string()));
        }
        let entry = Entry {
            value: value.to_vec(),
            expires_at: ttl.filter(|t| !t.is_zero()).map(|t| Instant::now() + t),
        };
        self.data
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let data = self.data.read();
            match data.get(namespace).and_then(|ns| ns.get(key)) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // expired: drop it
        if let Some(ns) = self.data.write().get_mut(namespace) {
            ns.remove(key);
        }
        Ok(None)
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        if let Some(ns) = self.data.write().get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }

    fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        Ok(self
            .data
            .read()
            .get(namespace)
            .map(|ns| {
                ns.iter()
                    .filter(|(_, entry)| !entry.is_expired(now))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn cleanup_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut removed = 0;
        let mut data = self.data.write();
        for ns in data.values_mut() {
            let before = ns.len();
            ns.retain(|_, entry| !entry.is_expired(now));
            removed += before - ns.len();
        }
        data.retain(|_, ns| !ns.is_empty());
        Ok(removed)
    }
}

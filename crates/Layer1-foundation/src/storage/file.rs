//! Directory-backed shared store
//!
//! Layout: `root/<namespace>/<key>.json`, each file holding
//! `{"value": "...", "expires_at": "..."}`.

use super::SharedStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const RECORD_EXT: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// File store
///
/// Values must be UTF-8; the team only ever writes JSON text.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            Error::Storage(format!("Failed to create {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    /// Keys are flattened to their last path component
    fn record_path(&self, namespace: &str, key: &str) -> PathBuf {
        let file = Path::new(key)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.replace(['/', '\\'], "_"));
        self.namespace_dir(namespace)
            .join(format!("{}.{}", file, RECORD_EXT))
    }

    fn read_record(path: &Path) -> Result<Option<FileRecord>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Storage(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

impl SharedStore for FileStore {
    fn set(&self, namespace: &str, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        if namespace.is_empty() || key.is_empty() {
            return Err(Error::Storage("namespace and key required".to_string()));
        }
        let value = String::from_utf8(value.to_vec())
            .map_err(|_| Error::Storage(format!("Value for {} is not UTF-8", key)))?;
        let expires_at = ttl
            .filter(|t| !t.is_zero())
            .and_then(|t| chrono::Duration::from_std(t).ok())
            .map(|t| Utc::now() + t);
        let content = serde_json::to_string(&FileRecord { value, expires_at })?;

        let _guard = self.lock.write();
        let dir = self.namespace_dir(namespace);
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;
        let path = self.record_path(namespace, key);
        std::fs::write(&path, content)
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.record_path(namespace, key);
        let record = {
            let _guard = self.lock.read();
            Self::read_record(&path)?
        };
        match record {
            None => Ok(None),
            Some(record) if record.is_expired(Utc::now()) => {
                let _guard = self.lock.write();
                let _ = std::fs::remove_file(&path);
                Ok(None)
            }
            Some(record) => Ok(Some(record.value.into_bytes())),
        }
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let _guard = self.lock.write();
        let path = self.record_path(namespace, key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        let _guard = self.lock.read();
        let dir = self.namespace_dir(namespace);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|e| e == RECORD_EXT).unwrap_or(false))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect())
    }

    fn cleanup_expired(&self) -> Result<usize> {
        let _guard = self.lock.write();
        let namespaces = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let mut removed = 0;
        for ns in namespaces.filter_map(|e| e.ok()) {
            if !ns.path().is_dir() {
                continue;
            }
            let Ok(files) = std::fs::read_dir(ns.path()) else {
                continue;
            };
            for file in files.filter_map(|e| e.ok()) {
                let path = file.path();
                if path.extension().map(|e| e != RECORD_EXT).unwrap_or(true) {
                    continue;
                }
                let stale = match Self::read_record(&path) {
                    Ok(Some(record)) => record.is_expired(now),
                    Ok(None) => false,
                    // unreadable records are garbage
                    Err(_) => true,
                };
                if stale && std::fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

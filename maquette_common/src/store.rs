//! Key/value configuration store.
//!
//! The rig keeps tunables (velocities, tilt limits, ...) in a flat
//! key/value store that operators read and write over the command
//! protocol. The core only depends on the [`ConfigStore`] trait; two
//! implementations are provided:
//!
//! | Type | Persistence |
//! |------|-------------|
//! | [`MemoryConfigStore`] | none, `save`/`load` are no-ops |
//! | [`TomlFileStore`] | flat TOML table on disk |
//!
//! Capacity is limited to [`MAX_STORE_ITEMS`] keys. Updating an existing
//! key always succeeds; inserting a new key into a full store is refused.

use crate::consts::MAX_STORE_ITEMS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Store operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No room for another key.
    #[error("configuration store is full ({MAX_STORE_ITEMS} items)")]
    Full,

    /// Reading or writing the backing file failed.
    #[error("configuration store I/O error: {0}")]
    Io(String),

    /// The backing file is not a flat key/value table.
    #[error("configuration store parse error: {0}")]
    Parse(String),
}

/// A stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl StoreValue {
    /// Infer a value from protocol text: integer, then float, then bool,
    /// otherwise text.
    pub fn infer(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(v) = raw.parse::<i64>() {
            return Self::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return Self::Float(v);
        }
        match raw.to_ascii_lowercase().as_str() {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(v) => Some(*v != 0),
            Self::Float(v) => Some(*v != 0.0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
        }
    }
}

impl fmt::Display for StoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Key/value configuration store.
///
/// Implementors provide raw access plus persistence. Typed getters fall
/// back to the supplied default when the key is missing or the value
/// cannot be converted.
pub trait ConfigStore: Send {
    /// Raw value for `key`.
    fn value(&self, key: &str) -> Option<&StoreValue>;

    /// Insert or replace `key`.
    fn put(&mut self, key: &str, value: StoreValue) -> Result<(), StoreError>;

    /// All keys in sorted order.
    fn keys(&self) -> Vec<String>;

    /// Persist current contents.
    fn save(&mut self) -> Result<(), StoreError>;

    /// Replace current contents with the persisted ones.
    fn load(&mut self) -> Result<(), StoreError>;

    fn has_key(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.value(key).and_then(StoreValue::as_i64).unwrap_or(default)
    }

    fn get_float(&self, key: &str, default: f64) -> f64 {
        self.value(key).and_then(StoreValue::as_f64).unwrap_or(default)
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.value(key).and_then(StoreValue::as_bool).unwrap_or(default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.value(key)
            .map_or_else(|| default.to_string(), ToString::to_string)
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), StoreError> {
        self.put(key, StoreValue::Int(value))
    }

    fn set_float(&mut self, key: &str, value: f64) -> Result<(), StoreError> {
        self.put(key, StoreValue::Float(value))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        self.put(key, StoreValue::Bool(value))
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.put(key, StoreValue::Text(value.to_string()))
    }

    /// Store protocol text, inferring its type.
    fn set_raw(&mut self, key: &str, raw: &str) -> Result<(), StoreError> {
        self.put(key, StoreValue::infer(raw))
    }
}

// ─── In-memory store ────────────────────────────────────────────────

/// Volatile store. `save` and `load` succeed without doing anything.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    items: BTreeMap<String, StoreValue>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn insert(&mut self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        let key = key.trim();
        if !self.items.contains_key(key) && self.items.len() >= MAX_STORE_ITEMS {
            warn!(key, "configuration store full, key refused");
            return Err(StoreError::Full);
        }
        debug!(key, %value, "store set");
        self.items.insert(key.to_string(), value);
        Ok(())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn value(&self, key: &str) -> Option<&StoreValue> {
        self.items.get(key.trim())
    }

    fn put(&mut self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        self.insert(key, value)
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    fn save(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn load(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ─── TOML file store ────────────────────────────────────────────────

/// Store persisted as a flat TOML table.
///
/// ```toml
/// velocity_x = 12000
/// tilt_min = 30.0
/// operator = "bench"
/// ```
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
    items: MemoryConfigStore,
}

impl TomlFileStore {
    /// Create a store bound to `path` without touching the file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: MemoryConfigStore::new(),
        }
    }

    /// Create a store and load `path` if it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlFileStore {
    fn value(&self, key: &str) -> Option<&StoreValue> {
        self.items.value(key)
    }

    fn put(&mut self, key: &str, value: StoreValue) -> Result<(), StoreError> {
        self.items.put(key, value)
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys()
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let text =
            toml::to_string(&self.items.items).map_err(|e| StoreError::Parse(e.to_string()))?;
        std::fs::write(&self.path, text).map_err(|e| StoreError::Io(e.to_string()))?;
        info!(path = %self.path.display(), items = self.items.len(), "configuration saved");
        Ok(())
    }

    fn load(&mut self) -> Result<(), StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no configuration file, starting empty");
                self.items = MemoryConfigStore::new();
                return Ok(());
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        let parsed: BTreeMap<String, StoreValue> =
            toml::from_str(&content).map_err(|e| StoreError::Parse(e.to_string()))?;

        let mut items = MemoryConfigStore::new();
        for (key, value) in parsed {
            if items.insert(&key, value).is_err() {
                warn!(path = %self.path.display(), "configuration file has too many items, rest ignored");
                break;
            }
        }
        info!(path = %self.path.display(), items = items.len(), "configuration loaded");
        self.items = items;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_value_types() {
        assert_eq!(StoreValue::infer("42"), StoreValue::Int(42));
        assert_eq!(StoreValue::infer("-1.5"), StoreValue::Float(-1.5));
        assert_eq!(StoreValue::infer("TRUE"), StoreValue::Bool(true));
        assert_eq!(
            StoreValue::infer(" bench "),
            StoreValue::Text("bench".to_string())
        );
    }

    #[test]
    fn typed_getters_fall_back_to_default() {
        let mut store = MemoryConfigStore::new();
        store.set_raw("velocity_x", "12000").unwrap();
        store.set_raw("name", "rig").unwrap();

        assert_eq!(store.get_int("velocity_x", 0), 12000);
        assert_eq!(store.get_float("velocity_x", 0.0), 12000.0);
        assert_eq!(store.get_float("name", 7.5), 7.5);
        assert_eq!(store.get_float("missing", 3.0), 3.0);
        assert!(store.get_bool("missing", true));
        assert_eq!(store.get_string("name", ""), "rig");
        assert_eq!(store.get_string("missing", "dflt"), "dflt");
    }

    #[test]
    fn full_store_refuses_new_keys_only() {
        let mut store = MemoryConfigStore::new();
        for i in 0..MAX_STORE_ITEMS {
            store.set_int(&format!("k{i}"), i as i64).unwrap();
        }
        assert_eq!(store.set_int("one_more", 1), Err(StoreError::Full));
        assert!(store.set_int("k0", 99).is_ok());
        assert_eq!(store.get_int("k0", 0), 99);
    }

    #[test]
    fn keys_are_sorted() {
        let mut store = MemoryConfigStore::new();
        store.set_bool("b", true).unwrap();
        store.set_bool("a", false).unwrap();
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}

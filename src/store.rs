//! Key/value persistence.
//!
//! A [`StorageBackend`] is a plain string store. [`Store`] layers JSON
//! encoding and default fallback on top and never reports a failure to its
//! caller: backend errors are logged and swallowed, and a slot that does not
//! decode is purged.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Durable, synchronous, process-local string storage keyed by opaque keys.
pub trait StorageBackend {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: String) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

fn check_quota(quota: Option<usize>, needed: usize) -> StoreResult<()> {
    match quota {
        Some(quota) if needed > quota => Err(StoreError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

fn slots_size(slots: &BTreeMap<String, String>) -> usize {
    slots.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// In-process backend. Clones share the same slots.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    slots: Rc<RefCell<BTreeMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: Rc::default(),
            quota: Some(quota),
        }
    }

    /// Write a raw slot, bypassing encoding. Lets tests plant corrupt data.
    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), raw.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let mut slots = self.slots.borrow_mut();
        let current = slots_size(&slots) - slots.get(key).map_or(0, |old| key.len() + old.len());
        check_quota(self.quota, current + key.len() + value.len())?;
        slots.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

/// Backend persisting every slot into one JSON object file.
///
/// The file is re-read on every call, so two handles on the same path always
/// agree. Writes replace the whole file atomically. A file that is not a
/// JSON object is moved aside to `<file>.bak` rather than overwritten.
#[derive(Clone, Debug)]
pub struct FileBackend {
    path: PathBuf,
    quota: Option<usize>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota: None,
        }
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the storage file, e.g. `storage.json.bak`.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn read_slots(&self) -> StoreResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let object: Map<String, Value> = match serde_json::from_str(&data) {
            Ok(object) => object,
            Err(err) => {
                let backup = self.sibling(".bak");
                log::warn!(
                    "storage file {} is not a JSON object ({err}), moving it to {}",
                    self.path.display(),
                    backup.display()
                );
                fs::rename(&self.path, &backup)?;
                return Ok(BTreeMap::new());
            }
        };
        let mut slots = BTreeMap::new();
        for (key, value) in object {
            match value {
                Value::String(text) => {
                    slots.insert(key, text);
                }
                Value::Null => log::warn!("dropping null slot {key} from storage file"),
                // Hand-edited files may hold structured values directly;
                // keep them in the encoded form `Store::set` would write.
                other => {
                    log::warn!("storage slot {key} is not a string, keeping its JSON text");
                    slots.insert(key, other.to_string());
                }
            }
        }
        Ok(slots)
    }

    /// Write to a temporary sibling and rename it over the storage file, so
    /// an interrupted write never leaves a truncated file behind.
    fn write_slots(&self, slots: &BTreeMap<String, String>) -> StoreResult<()> {
        let data = serde_json::to_string_pretty(slots)?;
        check_quota(self.quota, data.len())?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.sibling(".tmp");
        fs::write(&staging, data)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.read_slots()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let mut slots = self.read_slots()?;
        slots.insert(key.to_string(), value);
        self.write_slots(&slots)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut slots = self.read_slots()?;
        if slots.remove(key).is_some() {
            self.write_slots(&slots)?;
        }
        Ok(())
    }
}

/// JSON-aware adapter over a [`StorageBackend`].
#[derive(Clone, Debug)]
pub struct Store<B> {
    backend: B,
}

impl<B: StorageBackend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read `key`. Values that look structured (`{`/`[`) are decoded as JSON,
    /// anything else comes back as a string. Absent or undecodable slots yield
    /// `default`; undecodable ones are removed.
    pub fn get(&self, key: &str, default: Value) -> Value {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(err) => {
                log::error!("Error retrieving {key} from storage: {err}");
                return default;
            }
        };
        if raw.starts_with('{') || raw.starts_with('[') {
            match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    log::error!("Discarding corrupt value for {key}: {err}");
                    self.remove(key);
                    default
                }
            }
        } else {
            Value::String(raw)
        }
    }

    /// Typed read. A value of the wrong shape is treated like corruption.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let value = self.get(key, Value::Null);
        if value.is_null() {
            return default;
        }
        match serde_json::from_value(value) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::error!("Discarding {key}, stored value has the wrong shape: {err}");
                self.remove(key);
                default
            }
        }
    }

    /// Convenience for string slots such as the theme name.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key, Value::Null) {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    /// Persist `value`. Failures are logged; the caller must not assume the
    /// write landed.
    pub fn set(&self, key: &str, value: &Value) {
        let encoded = match value {
            Value::String(text) => text.clone(),
            Value::Array(_) | Value::Object(_) => match serde_json::to_string(value) {
                Ok(encoded) => encoded,
                Err(err) => {
                    log::error!("Error encoding {key}: {err}");
                    return;
                }
            },
            scalar => scalar.to_string(),
        };
        if let Err(err) = self.backend.set(key, encoded) {
            log::error!("Error saving {key} to storage: {err}");
        }
    }

    pub fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, &value),
            Err(err) => log::error!("Error encoding {key}: {err}"),
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(err) = self.backend.remove(key) {
            log::error!("Error removing {key} from storage: {err}");
        }
    }
}

#![deny(warnings)]

//! Persistence layer: key-value storage backends and the JSON save slot.
//!
//! The game only needs `get`/`set`/`remove` on string blobs. [`SaveSlot`]
//! wraps a backend and degrades to a no-op for the rest of the session once
//! the backend reports itself unavailable, so gameplay never blocks on it.

pub mod schema;

pub use schema::{decode, encode, pretty, SaveFile, SCHEMA_VERSION};

use idle_core::GameState;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Key the game state is stored under.
pub const SAVE_KEY: &str = "idleGitHub";
/// File name offered for exported saves.
pub const EXPORT_FILE_NAME: &str = "idle-github-save.json";

/// Errors produced by the save layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PersistError {
    /// The stored blob could not be parsed or fails validation.
    #[error("save data is corrupted: {0}")]
    CorruptSave(String),
    /// The backend cannot be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        PersistError::StorageUnavailable(e.to_string())
    }
}

/// Synchronous string key-value store.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistError>;
}

/// In-process store, mainly for tests and headless runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StorageUnavailable`.
    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    fn check(&self) -> Result<(), PersistError> {
        if self.unavailable {
            return Err(PersistError::StorageUnavailable(
                "memory store disabled".into(),
            ));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        self.check()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.check()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.check()?;
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory of `<key>.json` files.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write then rename so a crash never leaves a half-written save.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// A single save entry on top of a storage backend.
#[derive(Debug)]
pub struct SaveSlot<S> {
    storage: S,
    key: String,
    degraded: bool,
}

impl<S: Storage> SaveSlot<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, SAVE_KEY)
    }

    pub fn with_key(storage: S, key: &str) -> Self {
        Self {
            storage,
            key: key.to_string(),
            degraded: false,
        }
    }

    /// True once the backend has failed; reads and writes are skipped from then on.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn degrade(&mut self, err: PersistError) -> PersistError {
        if let PersistError::StorageUnavailable(msg) = &err {
            if !self.degraded {
                warn!(key = %self.key, error = %msg, "storage unavailable; saving disabled for this session");
            }
            self.degraded = true;
        }
        err
    }

    /// Load the stored game, `Ok(None)` when nothing was saved yet.
    pub fn load(&mut self) -> Result<Option<GameState>, PersistError> {
        if self.degraded {
            return Ok(None);
        }
        let blob = match self.storage.get(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Ok(None),
            Err(e) => return Err(self.degrade(e)),
        };
        let state = decode(&blob)?;
        info!(key = %self.key, level = state.economy.level, "save loaded");
        Ok(Some(state))
    }

    /// Write the state. Returns `Ok(false)` when skipped because the slot is degraded.
    pub fn save(&mut self, state: &GameState) -> Result<bool, PersistError> {
        if self.degraded {
            return Ok(false);
        }
        let blob = encode(state)?;
        match self.storage.set(&self.key, &blob) {
            Ok(()) => {
                debug!(key = %self.key, bytes = blob.len(), "saved");
                Ok(true)
            }
            Err(e) => Err(self.degrade(e)),
        }
    }

    pub fn clear(&mut self) -> Result<(), PersistError> {
        if self.degraded {
            return Ok(());
        }
        self.storage
            .remove(&self.key)
            .map_err(|e| self.degrade(e))
    }

    /// Stored save re-indented for download, `None` when nothing was saved.
    pub fn export(&self) -> Result<Option<String>, PersistError> {
        if self.degraded {
            return Ok(None);
        }
        match self.storage.get(&self.key)? {
            Some(blob) => pretty(&blob).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idle_core::UpgradeId;

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("idle-persist-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn slot_roundtrip_in_memory() {
        let mut slot = SaveSlot::new(MemoryStorage::new());
        assert_eq!(slot.load().unwrap(), None);
        let mut s = GameState::new(10);
        s.economy.commits = 99.0;
        assert!(slot.save(&s).unwrap());
        assert_eq!(slot.load().unwrap(), Some(s));
        slot.clear().unwrap();
        assert_eq!(slot.load().unwrap(), None);
    }

    #[test]
    fn corrupt_blob_reports_and_keeps_slot_usable() {
        let mut store = MemoryStorage::new();
        store.set(SAVE_KEY, "{{{").unwrap();
        let mut slot = SaveSlot::new(store);
        assert!(matches!(slot.load(), Err(PersistError::CorruptSave(_))));
        assert!(!slot.is_degraded());
        assert!(slot.save(&GameState::default()).unwrap());
    }

    #[test]
    fn unavailable_storage_degrades_to_noop() {
        let mut store = MemoryStorage::new();
        store.set_available(false);
        let mut slot = SaveSlot::new(store);
        assert!(matches!(
            slot.save(&GameState::default()),
            Err(PersistError::StorageUnavailable(_))
        ));
        assert!(slot.is_degraded());
        assert_eq!(slot.save(&GameState::default()), Ok(false));
        assert_eq!(slot.load(), Ok(None));
        assert_eq!(slot.clear(), Ok(()));
        assert_eq!(slot.export(), Ok(None));
    }

    #[test]
    fn export_is_pretty_and_read_only() {
        let mut slot = SaveSlot::new(MemoryStorage::new());
        assert_eq!(slot.export().unwrap(), None);
        let mut s = GameState::default();
        s.upgrades.get_mut(&UpgradeId::Intern).unwrap().count = 3;
        slot.save(&s).unwrap();
        let before = slot.storage().get(SAVE_KEY).unwrap();
        let out = slot.export().unwrap().unwrap();
        assert!(out.contains("\n  \"commits\""));
        assert_eq!(decode(&out).unwrap(), s);
        assert_eq!(slot.storage().get(SAVE_KEY).unwrap(), before);
    }

    #[test]
    fn file_storage_roundtrip() {
        let dir = temp_dir("roundtrip");
        let mut fsx = FileStorage::new(&dir);
        assert_eq!(fsx.get("k").unwrap(), None);
        fsx.set("k", "{\"a\":1}").unwrap();
        assert_eq!(fsx.get("k").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(fsx.path_for("k").exists());
        fsx.remove("k").unwrap();
        fsx.remove("k").unwrap();
        assert_eq!(fsx.get("k").unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }
}

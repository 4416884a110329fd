//! Key-value persistence backends.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::common::collections::HashMap;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, String>,
    writes: usize,
}

/// Shared in-memory store; clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Rc<RefCell<MemoryState>>);

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Number of `set` calls so far.
    pub fn writes(&self) -> usize { self.0.borrow().writes }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.0.borrow().entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut state = self.0.borrow_mut();
        state.entries.insert(key.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.0.borrow_mut().entries.remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    value: String,
}

/// One RON file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { FileStore { dir: dir.into() } }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
            .collect();
        self.dir.join(format!("{name}.ron"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let buf = fs::read_to_string(&path)?;
        let entry: StoredEntry = ron::from_str(&buf)?;
        if entry.key != key {
            bail!("{} holds key {:?}, expected {:?}", path.display(), entry.key, key);
        }
        Ok(Some(entry.value))
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let entry = StoredEntry {
            key: key.to_string(),
            value: value.to_string(),
        };
        let tmp = path.with_extension("ron.tmp");
        fs::write(&tmp, ron::ser::to_string(&entry)?.as_bytes())?;
        fs::rename(&tmp, &path)?;
        trace!(path = %path.display(), bytes = value.len(), "stored value");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

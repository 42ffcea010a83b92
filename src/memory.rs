//! Operation memory: the most recent allowed and blocked file operations,
//! persisted as one JSON document under `<state_root>/state/`.
//!
//! Each list is a [`BoundedRing`]; once full, the oldest entry is dropped.
//! Updates hold an exclusive lock across read-modify-write, so concurrent
//! hooks serialize instead of overwriting each other.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::StoreError;

pub const STATE_DIR: &str = "state";
pub const MEMORY_FILE: &str = "agent-memory.json";

/// Fixed-capacity FIFO that keeps only the newest `capacity` items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedRing<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> BoundedRing<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Build from oldest-first items, keeping the newest `capacity`.
    pub fn from_vec(capacity: usize, items: Vec<T>) -> Self {
        let skip = items.len().saturating_sub(capacity);
        Self {
            capacity,
            items: items.into_iter().skip(skip).collect(),
        }
    }

    /// Append, evicting the oldest item when full. A zero-capacity ring
    /// stays empty.
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items.into()
    }
}

impl<T: Serialize> Serialize for BoundedRing<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub timestamp: String,
    pub action: String,
    pub file: String,
    pub blocked: bool,
}

impl MemoryEntry {
    pub fn now(action: &str, file: &str, blocked: bool) -> Self {
        Self {
            timestamp: crate::logging::timestamp_now(),
            action: action.to_string(),
            file: file.to_string(),
            blocked,
        }
    }
}

/// On-disk shape; capacity is not persisted.
#[derive(Debug, Default, Deserialize)]
struct MemoryDocument {
    #[serde(default)]
    file_operations: Vec<MemoryEntry>,
    #[serde(default)]
    blocked_operations: Vec<MemoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationMemory {
    pub file_operations: BoundedRing<MemoryEntry>,
    pub blocked_operations: BoundedRing<MemoryEntry>,
}

impl OperationMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            file_operations: BoundedRing::new(capacity),
            blocked_operations: BoundedRing::new(capacity),
        }
    }

    fn from_document(doc: MemoryDocument, capacity: usize) -> Self {
        Self {
            file_operations: BoundedRing::from_vec(capacity, doc.file_operations),
            blocked_operations: BoundedRing::from_vec(capacity, doc.blocked_operations),
        }
    }

    /// Parse a persisted document. Empty or corrupt input yields an empty memory.
    pub fn from_json(raw: &str, capacity: usize) -> Self {
        if raw.trim().is_empty() {
            return Self::new(capacity);
        }
        match serde_json::from_str::<MemoryDocument>(raw) {
            Ok(doc) => Self::from_document(doc, capacity),
            Err(e) => {
                log::warn!("operation memory unreadable, starting fresh: {e}");
                Self::new(capacity)
            }
        }
    }

    /// File the entry under `blocked_operations` or `file_operations`.
    pub fn record(&mut self, entry: MemoryEntry) {
        if entry.blocked {
            self.blocked_operations.push(entry);
        } else {
            self.file_operations.push(entry);
        }
    }
}

/// Owner of the memory document on disk.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
    capacity: usize,
}

impl MemoryStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    /// `<state_root>/state/agent-memory.json`.
    pub fn in_state_dir(state_root: &Path, capacity: usize) -> Self {
        Self::new(state_root.join(STATE_DIR).join(MEMORY_FILE), capacity)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<OperationMemory, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(OperationMemory::from_json(&raw, self.capacity)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(OperationMemory::new(self.capacity))
            }
            Err(e) => Err(StoreError::io(&self.path)(e)),
        }
    }

    /// Add one entry and rewrite the document under an exclusive lock.
    pub fn record(&self, entry: MemoryEntry) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(StoreError::io(dir))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(StoreError::io(&self.path))?;
        file.lock_exclusive().map_err(StoreError::io(&self.path))?;
        let result = self.rewrite_locked(&mut file, entry);
        let _ = FileExt::unlock(&file);
        result
    }

    fn rewrite_locked(&self, file: &mut std::fs::File, entry: MemoryEntry) -> Result<(), StoreError> {
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .map_err(StoreError::io(&self.path))?;

        let mut memory = OperationMemory::from_json(&raw, self.capacity);
        memory.record(entry);
        let body = serde_json::to_string_pretty(&memory)?;

        file.set_len(0).map_err(StoreError::io(&self.path))?;
        file.seek(SeekFrom::Start(0))
            .map_err(StoreError::io(&self.path))?;
        file.write_all(body.as_bytes())
            .map_err(StoreError::io(&self.path))?;
        Ok(())
    }
}

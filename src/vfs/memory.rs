//! In-memory backing store
//!
//! Simple, fast, ephemeral. Content lives in a slab of nodes, each behind
//! its own lock so I/O on different files never contends. A name index
//! sits on top; detaching a name leaves the node alive until reclaimed.

use super::{BackingStore, StoreHandle, validate_name};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use slab::Slab;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// A file's content
type Node = Arc<Mutex<Vec<u8>>>;

#[derive(Debug)]
struct StoreInner {
    /// All content, named or detached
    nodes: Slab<Node>,
    /// Name index into `nodes`
    names: HashMap<String, usize>,
}

/// In-memory store
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

/// Serializable image of every named file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub files: BTreeMap<String, Vec<u8>>,
}

fn bad_handle() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "invalid store handle")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                nodes: Slab::new(),
                names: HashMap::new(),
            }),
        }
    }

    fn node(&self, handle: StoreHandle) -> io::Result<Node> {
        self.inner
            .lock()
            .nodes
            .get(handle.0)
            .cloned()
            .ok_or_else(bad_handle)
    }

    /// Number of content nodes, named or detached
    pub fn node_count(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    /// Capture every named file
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.lock();
        let files = inner
            .names
            .iter()
            .filter_map(|(name, &key)| {
                inner
                    .nodes
                    .get(key)
                    .map(|node| (name.clone(), node.lock().clone()))
            })
            .collect();
        StoreSnapshot { files }
    }

    /// Rebuild a store from a snapshot
    pub fn from_snapshot(snapshot: StoreSnapshot) -> io::Result<Self> {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for (name, data) in snapshot.files {
                validate_name(&name)?;
                let key = inner.nodes.insert(Arc::new(Mutex::new(data)));
                inner.names.insert(name, key);
            }
        }
        Ok(store)
    }

    /// Serialize named files to JSON
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.snapshot())
    }

    /// Restore from JSON produced by `to_json`
    pub fn from_json(data: &[u8]) -> io::Result<Self> {
        let snapshot: StoreSnapshot = serde_json::from_slice(data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Self::from_snapshot(snapshot)
    }

    /// Write a JSON snapshot to the host filesystem
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let data = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, data)
    }

    /// Load a JSON snapshot from the host filesystem
    pub fn load(path: &Path) -> io::Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingStore for MemoryStore {
    fn create(&self, name: &str) -> io::Result<StoreHandle> {
        validate_name(name)?;
        let mut inner = self.inner.lock();
        if inner.names.contains_key(name) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", name),
            ));
        }
        let key = inner.nodes.insert(Arc::new(Mutex::new(Vec::new())));
        inner.names.insert(name.to_string(), key);
        Ok(StoreHandle(key))
    }

    fn open(&self, name: &str) -> io::Result<StoreHandle> {
        validate_name(name)?;
        self.inner
            .lock()
            .names
            .get(name)
            .map(|&key| StoreHandle(key))
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("file not found: {}", name))
            })
    }

    fn read_at(&self, handle: StoreHandle, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let node = self.node(handle)?;
        let data = node.lock();

        let offset = offset as usize;
        let available = data.len().saturating_sub(offset);
        let to_read = buf.len().min(available);
        if to_read > 0 {
            buf[..to_read].copy_from_slice(&data[offset..offset + to_read]);
        }
        Ok(to_read)
    }

    fn write_at(&self, handle: StoreHandle, offset: u64, buf: &[u8]) -> io::Result<usize> {
        let node = self.node(handle)?;
        let mut data = node.lock();

        let offset = offset as usize;
        let end = offset
            .checked_add(buf.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "write past end"))?;

        // Extend file if necessary
        if end > data.len() {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn truncate(&self, handle: StoreHandle) -> io::Result<()> {
        self.node(handle)?.lock().clear();
        Ok(())
    }

    fn len(&self, handle: StoreHandle) -> io::Result<u64> {
        Ok(self.node(handle)?.lock().len() as u64)
    }

    fn detach(&self, name: &str) -> io::Result<StoreHandle> {
        self.inner
            .lock()
            .names
            .remove(name)
            .map(StoreHandle)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("file not found: {}", name))
            })
    }

    fn reclaim(&self, handle: StoreHandle) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.names.values().any(|&key| key == handle.0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot reclaim named content",
            ));
        }
        inner.nodes.try_remove(handle.0).map(|_| ()).ok_or_else(bad_handle)
    }

    fn exists(&self, name: &str) -> bool {
        self.inner.lock().names.contains_key(name)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().names.keys().cloned().collect();
        names.sort();
        names
    }
}

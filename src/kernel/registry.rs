//! File registry
//!
//! The system-wide view of files that processes have open. Each entry
//! binds a name to store content and counts the descriptors pointing at
//! it. Entries live in an arena and are addressed by `EntryId`, never by
//! reference, so descriptors in different processes can hold them without
//! sharing ownership.
//!
//! Reference counting rules:
//! - open() and create_or_truncate() hand out an entry with one reference
//!   already acquired, inside the same critical section as the lookup
//! - acquire() adds a reference to an entry that is already held
//! - release() drops one; the last release of an unlinked entry reclaims
//!   its content, and that is the only way opened content is deleted
//! - mark_pending_delete() unbinds the name at once, deletion waits for
//!   the last release
//!
//! Each entry also carries a write lock. A write syscall holds it for its
//! whole transfer so chunked writes from different descriptors never
//! interleave.

use super::syscall::{SyscallError, SyscallResult};
use crate::vfs::{BackingStore, StoreHandle, validate_name};
use log::{debug, warn};
use parking_lot::Mutex;
use slab::Slab;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// Index of an entry in the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub usize);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry:{}", self.0)
    }
}

/// A file that at least one descriptor has open
#[derive(Debug)]
struct RegistryEntry {
    /// None once unlinked
    name: Option<String>,
    store: StoreHandle,
    open_count: usize,
    pending_delete: bool,
    write_lock: Arc<Mutex<()>>,
}

struct RegistryInner {
    entries: Slab<RegistryEntry>,
    /// Live names only; unlinked entries are not reachable from here
    names: HashMap<String, EntryId>,
}

/// The system-wide file registry
pub struct FileRegistry {
    store: Arc<dyn BackingStore>,
    max_name_len: usize,
    inner: Mutex<RegistryInner>,
}

/// Map a store error from a by-name operation
fn name_error(e: io::Error) -> SyscallError {
    match e.kind() {
        io::ErrorKind::NotFound => SyscallError::NotFound,
        io::ErrorKind::InvalidInput => SyscallError::InvalidName,
        _ => SyscallError::Io(e.to_string()),
    }
}

impl FileRegistry {
    pub fn new(store: Arc<dyn BackingStore>, max_name_len: usize) -> Self {
        Self {
            store,
            max_name_len,
            inner: Mutex::new(RegistryInner {
                entries: Slab::new(),
                names: HashMap::new(),
            }),
        }
    }

    /// The store underneath
    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    fn check_name(&self, name: &str) -> SyscallResult<()> {
        if name.len() > self.max_name_len {
            return Err(SyscallError::InvalidName);
        }
        validate_name(name).map_err(|_| SyscallError::InvalidName)
    }

    /// Create a file, or empty an existing live one, and take a reference
    pub fn create_or_truncate(&self, name: &str) -> SyscallResult<(EntryId, StoreHandle)> {
        self.check_name(name)?;
        let mut inner = self.inner.lock();

        if let Some(&id) = inner.names.get(name) {
            let entry = &mut inner.entries[id.0];
            self.store.truncate(entry.store)?;
            entry.open_count += 1;
            return Ok((id, entry.store));
        }

        let handle = match self.store.open(name) {
            Ok(handle) => {
                self.store.truncate(handle)?;
                handle
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.store.create(name).map_err(name_error)?
            }
            Err(e) => return Err(name_error(e)),
        };
        Ok((Self::insert(&mut inner, name, handle), handle))
    }

    /// Open a live file by name and take a reference
    pub fn open(&self, name: &str) -> SyscallResult<(EntryId, StoreHandle)> {
        self.check_name(name)?;
        let mut inner = self.inner.lock();

        if let Some(&id) = inner.names.get(name) {
            let entry = &mut inner.entries[id.0];
            entry.open_count += 1;
            return Ok((id, entry.store));
        }

        let handle = self.store.open(name).map_err(name_error)?;
        Ok((Self::insert(&mut inner, name, handle), handle))
    }

    fn insert(inner: &mut RegistryInner, name: &str, handle: StoreHandle) -> EntryId {
        let id = EntryId(inner.entries.insert(RegistryEntry {
            name: Some(name.to_string()),
            store: handle,
            open_count: 1,
            pending_delete: false,
            write_lock: Arc::new(Mutex::new(())),
        }));
        inner.names.insert(name.to_string(), id);
        id
    }

    /// Add a reference to an entry the caller already holds
    ///
    /// Returns false if the entry does not exist.
    pub fn acquire(&self, id: EntryId) -> bool {
        match self.inner.lock().entries.get_mut(id.0) {
            Some(entry) => {
                entry.open_count += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a reference
    ///
    /// Returns true if this was the last reference to an unlinked file and
    /// its content was reclaimed. Panics on an unknown entry or a count
    /// that would go negative.
    pub fn release(&self, id: EntryId) -> bool {
        let mut inner = self.inner.lock();
        let entry = inner
            .entries
            .get_mut(id.0)
            .unwrap_or_else(|| panic!("release of unknown {}", id));
        assert!(entry.open_count > 0, "{} open count underflow", id);

        entry.open_count -= 1;
        if entry.open_count > 0 {
            return false;
        }

        let entry = inner.entries.remove(id.0);
        if let Some(name) = &entry.name {
            inner.names.remove(name);
        }
        if !entry.pending_delete {
            return false;
        }

        debug!("registry: last close of unlinked {}, reclaiming {}", id, entry.store);
        if let Err(e) = self.store.reclaim(entry.store) {
            warn!("registry: reclaim of {} failed: {}", entry.store, e);
        }
        true
    }

    /// Unlink a name
    ///
    /// The name stops resolving immediately. Content an open descriptor
    /// still points at survives until that descriptor's last release.
    pub fn mark_pending_delete(&self, name: &str) -> SyscallResult<()> {
        self.check_name(name)?;
        let mut inner = self.inner.lock();

        let Some(id) = inner.names.remove(name) else {
            // Never opened through the registry; nothing can reference it
            return self.store.remove(name).map_err(name_error);
        };

        self.store.detach(name).map_err(name_error)?;
        let entry = &mut inner.entries[id.0];
        entry.name = None;
        entry.pending_delete = true;

        if entry.open_count == 0 {
            let handle = entry.store;
            inner.entries.remove(id.0);
            self.store.reclaim(handle)?;
        } else {
            debug!(
                "registry: {} unlinked with {} open, deletion deferred",
                name, entry.open_count
            );
        }
        Ok(())
    }

    /// The lock serializing writes to an entry's content
    ///
    /// None if the entry does not exist. Callers hold a reference, so the
    /// entry outlives the transfer.
    pub fn write_lock(&self, id: EntryId) -> Option<Arc<Mutex<()>>> {
        self.inner
            .lock()
            .entries
            .get(id.0)
            .map(|e| Arc::clone(&e.write_lock))
    }

    /// Current reference count (0 if the entry is gone)
    pub fn open_count(&self, id: EntryId) -> usize {
        self.inner
            .lock()
            .entries
            .get(id.0)
            .map(|e| e.open_count)
            .unwrap_or(0)
    }

    /// Entries held open by at least one descriptor
    pub fn live_entries(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Unlinked entries still waiting for their last close
    pub fn pending_entries(&self) -> usize {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|(_, e)| e.pending_delete)
            .count()
    }

    /// Check if a name currently resolves
    pub fn is_live(&self, name: &str) -> bool {
        self.inner.lock().names.contains_key(name) || self.store.exists(name)
    }
}

//! Backing store
//!
//! A flat namespace of files. The kernel never sees raw storage, only
//! this trait: name → content, byte-range I/O, and a two-phase delete so
//! that content can outlive its name while descriptors still point at it.
//!
//! Design: trait-based abstraction, keeping it simple.

pub mod memory;

pub use memory::{MemoryStore, StoreSnapshot};

use std::io;

/// Longest filename (in bytes) the store accepts
pub const MAX_NAME_LEN: usize = 256;

/// Handle to a file's content inside a store
///
/// Stays valid after the name is detached, until the content is reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreHandle(pub usize);

impl std::fmt::Display for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store:{}", self.0)
    }
}

/// The BackingStore trait - implement this for different media
pub trait BackingStore: Send + Sync {
    /// Create a new, empty file. Fails if the name is taken or invalid.
    fn create(&self, name: &str) -> io::Result<StoreHandle>;

    /// Look up an existing file by name
    fn open(&self, name: &str) -> io::Result<StoreHandle>;

    /// Read into `buf` starting at `offset`. Returns fewer bytes at end of content.
    fn read_at(&self, handle: StoreHandle, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `buf` at `offset`, growing the file as needed
    fn write_at(&self, handle: StoreHandle, offset: u64, buf: &[u8]) -> io::Result<usize>;

    /// Discard all content
    fn truncate(&self, handle: StoreHandle) -> io::Result<()>;

    /// Current content length
    fn len(&self, handle: StoreHandle) -> io::Result<u64>;

    /// Unbind a name from its content. The content stays reachable through
    /// the returned handle until `reclaim` is called.
    fn detach(&self, name: &str) -> io::Result<StoreHandle>;

    /// Physically remove detached content
    fn reclaim(&self, handle: StoreHandle) -> io::Result<()>;

    /// Check if a name resolves
    fn exists(&self, name: &str) -> bool;

    /// All names currently bound
    fn names(&self) -> Vec<String>;

    /// Detach and reclaim in one step
    fn remove(&self, name: &str) -> io::Result<()> {
        let handle = self.detach(name)?;
        self.reclaim(handle)
    }
}

/// Check a filename against the store's naming rules
///
/// Names are flat: non-empty, at most `MAX_NAME_LEN` bytes, no `/` and no NUL.
pub fn validate_name(name: &str) -> io::Result<()> {
    if name.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty filename"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("filename longer than {} bytes", MAX_NAME_LEN),
        ));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "filename contains '/' or NUL",
        ));
    }
    Ok(())
}

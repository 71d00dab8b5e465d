//! userkern - a small teaching kernel: files, descriptors, and processes
//!
//! Design principles:
//! - Tractable: bounded complexity, comprehensible by one human
//! - Every resource has one owner; cross-links are by id, never by reference
//! - Processes are real threads, so every syscall is concurrency-safe
//!
//! Programs run against `kernel::UserContext`, a C-style ABI where every
//! call returns -1 on failure. The kernel underneath speaks typed results
//! (`kernel::SyscallResult`) and stores file content in a `vfs::BackingStore`.

pub mod kernel;
pub mod programs;
pub mod vfs;

/// Log to stderr
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        eprintln!($($t)*)
    };
}

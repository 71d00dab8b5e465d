//! The kernel - processes, open files, and the syscalls between them
//!
//! Layering, bottom up:
//! - `registry`: system-wide open-file state over the backing store
//! - `process`: per-process descriptor tables
//! - `manager`: process lifecycle (spawn, exit, join, reap)
//! - `syscall`: the typed kernel interface
//! - `user`: the integer ABI programs call

pub mod config;
pub mod console;
pub mod executor;
pub mod manager;
pub mod memory;
pub mod process;
pub mod program;
pub mod registry;
pub mod syscall;
pub mod user;


pub use config::{ConfigError, KernelConfig};
pub use console::{Console, MemoryConsole, StdioConsole};
pub use executor::{Executor, Job, ThreadExecutor};
pub use manager::ProcessManager;
pub use process::{ExitStatus, Fd, OpenFile, Pid, ProcessState};
pub use program::{program_fn, Program, ProgramLoader};
pub use registry::{EntryId, FileRegistry};
pub use syscall::{Kernel, SyscallError, SyscallNr, SyscallResult};
pub use user::UserContext;

//! Process abstraction
//!
//! A process is the unit of isolation: it owns a fixed-size file
//! descriptor table and runs one program image on its own thread.
//! Lifecycle bookkeeping (parent, children, exit status, pages) lives in
//! the process manager; this module holds the pieces a running process
//! touches on every syscall.

use super::registry::EntryId;
use super::syscall::{SyscallError, SyscallResult};
use crate::vfs::StoreHandle;
use parking_lot::Mutex;

/// Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid:{}", self.0)
    }
}

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Program is executing
    Running,
    /// Program has terminated; exit status is waiting for the parent
    Zombie,
    /// Exit status was collected (or nobody could collect it) and the
    /// record is gone
    Reaped,
}

/// How a program terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Returned from its entry point or called exit()
    Exited(i32),
    /// Faulted before finishing
    Abnormal,
}

impl ExitStatus {
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Exited(code) => Some(*code),
            ExitStatus::Abnormal => None,
        }
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exited({})", code),
            ExitStatus::Abnormal => write!(f, "abnormal"),
        }
    }
}

/// File descriptor - an index into a process's file table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fd(pub u32);

impl Fd {
    pub const STDIN: Fd = Fd(0);
    pub const STDOUT: Fd = Fd(1);

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Fd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fd:{}", self.0)
    }
}

/// Which side of the console a descriptor talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleEnd {
    Input,
    Output,
}

/// What an open descriptor refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFile {
    Console(ConsoleEnd),
    /// A registry entry (counted in its open count) plus the cursor
    File {
        entry: EntryId,
        store: StoreHandle,
        cursor: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    /// Allocated for an open in progress, not yet bound
    Reserved,
    Open(OpenFile),
}

/// A process's file descriptor table
///
/// Fixed capacity. Slots 0 and 1 start bound to the console. Allocation
/// always picks the lowest free slot.
pub struct FileTable {
    slots: Vec<Slot>,
    /// Set once the owning process exits; no further allocation
    shut_down: bool,
}

impl FileTable {
    /// Create a table of `capacity` slots with stdin/stdout bound
    pub fn new(capacity: usize) -> Self {
        let mut slots = vec![Slot::Free; capacity];
        if let Some(slot) = slots.get_mut(Fd::STDIN.index()) {
            *slot = Slot::Open(OpenFile::Console(ConsoleEnd::Input));
        }
        if let Some(slot) = slots.get_mut(Fd::STDOUT.index()) {
            *slot = Slot::Open(OpenFile::Console(ConsoleEnd::Output));
        }
        Self {
            slots,
            shut_down: false,
        }
    }

    /// Reserve the lowest free slot
    pub fn allocate_slot(&mut self) -> SyscallResult<Fd> {
        if self.shut_down {
            return Err(SyscallError::NoProcess);
        }
        let index = self
            .slots
            .iter()
            .position(|s| *s == Slot::Free)
            .ok_or(SyscallError::TooManyOpenFiles)?;
        self.slots[index] = Slot::Reserved;
        Ok(Fd(index as u32))
    }

    /// Attach an acquired registry reference to a reserved slot
    ///
    /// Panics if the slot was not reserved: the caller owns the reservation.
    pub fn bind(&mut self, fd: Fd, entry: EntryId, store: StoreHandle) {
        let slot = &mut self.slots[fd.index()];
        assert_eq!(*slot, Slot::Reserved, "binding unreserved {}", fd);
        *slot = Slot::Open(OpenFile::File {
            entry,
            store,
            cursor: 0,
        });
    }

    /// Give back a reservation whose open failed
    pub fn cancel(&mut self, fd: Fd) {
        if let Some(slot) = self.slots.get_mut(fd.index()) {
            if *slot == Slot::Reserved {
                *slot = Slot::Free;
            }
        }
    }

    /// Look up an open descriptor
    pub fn get(&self, fd: Fd) -> SyscallResult<OpenFile> {
        match self.slots.get(fd.index()) {
            Some(Slot::Open(file)) => Ok(*file),
            _ => Err(SyscallError::BadFd),
        }
    }

    /// Move a file descriptor's cursor forward
    pub fn advance(&mut self, fd: Fd, count: usize) -> SyscallResult<u64> {
        match self.slots.get_mut(fd.index()) {
            Some(Slot::Open(OpenFile::File { cursor, .. })) => {
                *cursor += count as u64;
                Ok(*cursor)
            }
            Some(Slot::Open(OpenFile::Console(_))) => Ok(0),
            _ => Err(SyscallError::BadFd),
        }
    }

    /// Free a slot, returning what was bound so the caller can release it
    pub fn close_slot(&mut self, fd: Fd) -> SyscallResult<OpenFile> {
        let slot = self.slots.get_mut(fd.index()).ok_or(SyscallError::BadFd)?;
        match *slot {
            Slot::Open(file) => {
                *slot = Slot::Free;
                Ok(file)
            }
            _ => Err(SyscallError::BadFd),
        }
    }

    /// Force-close every slot and refuse further allocation
    pub fn shutdown(&mut self) -> Vec<OpenFile> {
        self.shut_down = true;
        self.slots
            .iter_mut()
            .filter_map(|slot| match std::mem::replace(slot, Slot::Free) {
                Slot::Open(file) => Some(file),
                _ => None,
            })
            .collect()
    }

    /// Number of occupied slots (open or reserved)
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| **s != Slot::Free).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Open descriptors in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Fd, OpenFile)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Open(file) => Some((Fd(i as u32), *file)),
            _ => None,
        })
    }
}

/// A process in the system
pub struct Process {
    /// Unique process identifier
    pub pid: Pid,
    /// Image name (for debugging/display)
    pub name: String,
    /// File descriptor table
    pub files: Mutex<FileTable>,
}

impl Process {
    pub fn new(pid: Pid, name: String, max_open_files: usize) -> Self {
        Self {
            pid,
            name,
            files: Mutex::new(FileTable::new(max_open_files)),
        }
    }
}

//! Process manager
//!
//! Owns every process record and drives the lifecycle:
//!
//! ```text
//! spawn ──► Running ──exit──► Zombie ──join──► Reaped
//!                                │
//!                                └─ parent gone ──► Reaped
//! ```
//!
//! Each transition is a single step under the manager lock and happens
//! once. Exit tears down the descriptor table (releasing registry
//! references) and returns the process's pages; the record itself stays
//! until the parent joins. Children of an exiting process are handed to
//! the unreachable root (`parent == None`) and are reaped as soon as they
//! are zombies, since nobody can ask for their status.

use super::config::KernelConfig;
use super::memory::{PageNumber, PagePool};
use super::process::{ExitStatus, OpenFile, Pid, Process, ProcessState};
use super::registry::FileRegistry;
use super::syscall::{SyscallError, SyscallResult};
use log::debug;
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Lifecycle bookkeeping for one process
struct ProcessRecord {
    process: Arc<Process>,
    /// None for the root and for orphans
    parent: Option<Pid>,
    /// Running or Zombie; Reaped records are removed
    state: ProcessState,
    exit: Option<ExitStatus>,
    children: BTreeSet<Pid>,
    pages: Vec<PageNumber>,
    /// A parent thread is already waiting on this child
    join_claimed: bool,
}

struct ManagerInner {
    records: HashMap<Pid, ProcessRecord>,
    next_pid: u32,
    pages: PagePool,
    root: Option<Pid>,
    root_exit: Option<ExitStatus>,
    halted: bool,
}

/// The process table
pub struct ProcessManager {
    config: KernelConfig,
    registry: Arc<FileRegistry>,
    inner: Mutex<ManagerInner>,
    /// Signalled on every exit and on halt
    exited: Condvar,
}

impl ProcessManager {
    pub fn new(config: &KernelConfig, registry: Arc<FileRegistry>) -> Self {
        Self {
            config: config.clone(),
            registry,
            inner: Mutex::new(ManagerInner {
                records: HashMap::new(),
                next_pid: 0,
                pages: PagePool::new(config.phys_pages),
                root: None,
                root_exit: None,
                halted: false,
            }),
            exited: Condvar::new(),
        }
    }

    /// Allocate a process record in the Running state
    ///
    /// The first process created without a parent becomes the root.
    pub fn create(
        &self,
        parent: Option<Pid>,
        name: &str,
        image_pages: usize,
    ) -> SyscallResult<Arc<Process>> {
        let mut inner = self.inner.lock();

        if inner.halted {
            return Err(SyscallError::ResourceExhausted);
        }
        if let Some(ppid) = parent {
            match inner.records.get(&ppid) {
                Some(r) if r.state == ProcessState::Running => {}
                _ => return Err(SyscallError::NoProcess),
            }
        }
        if inner.records.len() >= self.config.max_processes {
            return Err(SyscallError::ResourceExhausted);
        }
        let pages = inner
            .pages
            .alloc(self.config.pages_for(image_pages))
            .ok_or(SyscallError::ResourceExhausted)?;

        let pid = Pid(inner.next_pid);
        inner.next_pid += 1;

        let process = Arc::new(Process::new(pid, name.to_string(), self.config.max_open_files));
        inner.records.insert(
            pid,
            ProcessRecord {
                process: Arc::clone(&process),
                parent,
                state: ProcessState::Running,
                exit: None,
                children: BTreeSet::new(),
                pages,
                join_claimed: false,
            },
        );
        match parent {
            Some(ppid) => {
                if let Some(p) = inner.records.get_mut(&ppid) {
                    p.children.insert(pid);
                }
            }
            None if inner.root.is_none() => inner.root = Some(pid),
            None => {}
        }

        debug!("spawn {} ({}) parent={:?}", pid, name, parent);
        Ok(process)
    }

    /// Undo `create` for a process that never started running
    pub fn abort(&self, pid: Pid) {
        let mut inner = self.inner.lock();
        let Some(mut record) = inner.records.remove(&pid) else {
            return;
        };
        record.process.files.lock().shutdown();
        inner.pages.release(std::mem::take(&mut record.pages));
        if let Some(p) = record.parent.and_then(|ppid| inner.records.get_mut(&ppid)) {
            p.children.remove(&pid);
        }
        if inner.root == Some(pid) {
            inner.root = None;
        }
        debug!("abort {}", pid);
    }

    /// Running → Zombie
    ///
    /// Returns false if the process was not running (already exited or
    /// unknown); the call is then a no-op.
    pub fn exit(&self, pid: Pid, status: ExitStatus) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let Some(record) = inner.records.get_mut(&pid) else {
            return false;
        };
        if record.state != ProcessState::Running {
            return false;
        }

        // Close every descriptor; releasing may complete deferred deletions
        let open = record.process.files.lock().shutdown();
        for file in open {
            if let OpenFile::File { entry, .. } = file {
                self.registry.release(entry);
            }
        }

        inner.pages.release(std::mem::take(&mut record.pages));
        record.state = ProcessState::Zombie;
        record.exit = Some(status);
        let parent = record.parent;
        let children = std::mem::take(&mut record.children);

        // Hand children to the unreachable root; zombies among them are done
        for child in children {
            let zombie = match inner.records.get_mut(&child) {
                Some(c) => {
                    c.parent = None;
                    c.state == ProcessState::Zombie
                }
                None => false,
            };
            if zombie {
                inner.records.remove(&child);
                debug!("reap orphaned zombie {}", child);
            }
        }

        if inner.root == Some(pid) {
            inner.root_exit = Some(status);
        }
        if parent.is_none() {
            inner.records.remove(&pid);
            debug!("exit {} {}, reaped (no parent)", pid, status);
        } else {
            debug!("exit {} {}", pid, status);
        }

        self.exited.notify_all();
        true
    }

    /// Wait for a child to exit and collect its status
    ///
    /// Blocks while the child is running. On return the child is reaped.
    pub fn join(&self, parent: Pid, child: Pid) -> SyscallResult<ExitStatus> {
        let mut inner = self.inner.lock();

        let record = inner
            .records
            .get_mut(&child)
            .filter(|r| r.parent == Some(parent))
            .ok_or(SyscallError::NotAChild)?;
        if record.join_claimed {
            return Err(SyscallError::AlreadyJoined);
        }
        record.join_claimed = true;

        loop {
            let current = inner
                .records
                .get(&child)
                .map(|r| (r.parent == Some(parent), r.state));
            match current {
                Some((true, ProcessState::Zombie)) => break,
                Some((true, _)) => self.exited.wait(&mut inner),
                // Reaped or reparented while we slept
                _ => return Err(SyscallError::NotAChild),
            }
        }

        let record = inner
            .records
            .remove(&child)
            .ok_or(SyscallError::NotAChild)?;
        if let Some(p) = inner.records.get_mut(&parent) {
            p.children.remove(&child);
        }
        let status = record.exit.unwrap_or(ExitStatus::Abnormal);
        debug!("reap {} {} (joined by {})", child, status, parent);
        Ok(status)
    }

    /// A running process, for syscalls it issues
    pub fn process(&self, pid: Pid) -> SyscallResult<Arc<Process>> {
        match self.inner.lock().records.get(&pid) {
            Some(r) if r.state == ProcessState::Running => Ok(Arc::clone(&r.process)),
            _ => Err(SyscallError::NoProcess),
        }
    }

    /// Lifecycle state of a pid
    ///
    /// `Reaped` for a pid that existed and is gone, `None` for a pid never
    /// handed out.
    pub fn state(&self, pid: Pid) -> Option<ProcessState> {
        let inner = self.inner.lock();
        match inner.records.get(&pid) {
            Some(r) => Some(r.state),
            None if pid.0 < inner.next_pid => Some(ProcessState::Reaped),
            None => None,
        }
    }

    pub fn parent_of(&self, pid: Pid) -> Option<Pid> {
        self.inner.lock().records.get(&pid).and_then(|r| r.parent)
    }

    pub fn children_of(&self, pid: Pid) -> Vec<Pid> {
        self.inner
            .lock()
            .records
            .get(&pid)
            .map(|r| r.children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Records still held (running or zombie)
    pub fn count(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn free_pages(&self) -> usize {
        self.inner.lock().pages.available()
    }

    pub fn root(&self) -> Option<Pid> {
        self.inner.lock().root
    }

    /// Stop the machine. Only the root process may do this.
    pub fn halt(&self, pid: Pid) -> SyscallResult<()> {
        let mut inner = self.inner.lock();
        if inner.root != Some(pid) {
            return Err(SyscallError::PermissionDenied);
        }
        inner.halted = true;
        debug!("halt requested by {}", pid);
        self.exited.notify_all();
        Ok(())
    }

    pub fn is_halted(&self) -> bool {
        self.inner.lock().halted
    }

    /// Block until the root process exits or the machine halts
    ///
    /// Returns the root's exit status, or None if the machine was halted
    /// or there is no root.
    pub fn wait_root(&self) -> Option<ExitStatus> {
        let mut inner = self.inner.lock();
        inner.root?;
        while inner.root_exit.is_none() && !inner.halted {
            self.exited.wait(&mut inner);
        }
        if inner.halted { None } else { inner.root_exit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryStore;
    use std::thread;
    use std::time::Duration;

    fn setup() -> (Arc<FileRegistry>, Arc<ProcessManager>) {
        let registry = Arc::new(FileRegistry::new(Arc::new(MemoryStore::new()), 256));
        let config = KernelConfig {
            phys_pages: 128,
            max_processes: 8,
            ..KernelConfig::default()
        };
        let manager = Arc::new(ProcessManager::new(&config, registry.clone()));
        (registry, manager)
    }

    #[test]
    fn test_root_and_child() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();
        let child = pm.create(Some(root.pid), "child", 1).unwrap();

        assert_eq!(pm.root(), Some(root.pid));
        assert_eq!(pm.parent_of(child.pid), Some(root.pid));
        assert_eq!(pm.children_of(root.pid), vec![child.pid]);
        assert_eq!(pm.state(child.pid), Some(ProcessState::Running));
        assert_eq!(pm.state(Pid(99)), None);
    }

    #[test]
    fn test_exit_then_join() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();
        let child = pm.create(Some(root.pid), "child", 1).unwrap();

        assert!(pm.exit(child.pid, ExitStatus::Exited(7)));
        assert_eq!(pm.state(child.pid), Some(ProcessState::Zombie));
        // Second exit is a no-op
        assert!(!pm.exit(child.pid, ExitStatus::Exited(9)));

        assert_eq!(pm.join(root.pid, child.pid), Ok(ExitStatus::Exited(7)));
        assert_eq!(pm.state(child.pid), Some(ProcessState::Reaped));
        assert_eq!(pm.join(root.pid, child.pid), Err(SyscallError::NotAChild));
        assert!(pm.children_of(root.pid).is_empty());
    }

    #[test]
    fn test_join_blocks_until_exit() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();
        let child = pm.create(Some(root.pid), "child", 1).unwrap();

        let pm2 = Arc::clone(&pm);
        let child_pid = child.pid;
        let exiter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            pm2.exit(child_pid, ExitStatus::Exited(42));
        });

        assert_eq!(pm.join(root.pid, child.pid), Ok(ExitStatus::Exited(42)));
        exiter.join().unwrap();
    }

    #[test]
    fn test_join_requires_parent() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();
        let a = pm.create(Some(root.pid), "a", 1).unwrap();
        let b = pm.create(Some(root.pid), "b", 1).unwrap();

        assert_eq!(pm.join(a.pid, b.pid), Err(SyscallError::NotAChild));
        assert_eq!(pm.join(root.pid, root.pid), Err(SyscallError::NotAChild));
        assert_eq!(pm.join(root.pid, Pid(1234)), Err(SyscallError::NotAChild));
    }

    #[test]
    fn test_concurrent_join_is_already_joined() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();
        let child = pm.create(Some(root.pid), "child", 1).unwrap();

        let pm2 = Arc::clone(&pm);
        let (root_pid, child_pid) = (root.pid, child.pid);
        let waiter = thread::spawn(move || pm2.join(root_pid, child_pid));

        // Let the first joiner claim the child
        while !pm.inner.lock().records[&child_pid].join_claimed {
            thread::yield_now();
        }
        assert_eq!(pm.join(root.pid, child.pid), Err(SyscallError::AlreadyJoined));

        pm.exit(child.pid, ExitStatus::Exited(1));
        assert_eq!(waiter.join().unwrap(), Ok(ExitStatus::Exited(1)));
    }

    #[test]
    fn test_exit_releases_pages_and_descriptors() {
        let (registry, pm) = setup();
        let before = pm.free_pages();
        let root = pm.create(None, "init", 3).unwrap();
        assert_eq!(pm.free_pages(), before - (3 + 8 + 1));

        let (entry, store) = registry.create_or_truncate("held").unwrap();
        {
            let mut files = root.files.lock();
            let fd = files.allocate_slot().unwrap();
            files.bind(fd, entry, store);
        }
        registry.mark_pending_delete("held").unwrap();
        assert_eq!(registry.pending_entries(), 1);

        pm.exit(root.pid, ExitStatus::Exited(0));
        assert_eq!(pm.free_pages(), before);
        assert_eq!(registry.live_entries(), 0);
        assert!(root.files.lock().is_shut_down());
    }

    #[test]
    fn test_orphans_are_reaped_without_join() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();
        let parent = pm.create(Some(root.pid), "parent", 1).unwrap();
        let zombie = pm.create(Some(parent.pid), "zombie", 1).unwrap();
        let running = pm.create(Some(parent.pid), "running", 1).unwrap();

        pm.exit(zombie.pid, ExitStatus::Exited(1));
        pm.exit(parent.pid, ExitStatus::Exited(0));

        // Zombie child reaped along with the parent's exit
        assert_eq!(pm.state(zombie.pid), Some(ProcessState::Reaped));
        // Running child now belongs to nobody
        assert_eq!(pm.parent_of(running.pid), None);

        pm.exit(running.pid, ExitStatus::Exited(2));
        assert_eq!(pm.state(running.pid), Some(ProcessState::Reaped));

        // Parent itself is still a zombie for root to collect
        assert_eq!(pm.join(root.pid, parent.pid), Ok(ExitStatus::Exited(0)));
        assert_eq!(pm.count(), 1);
    }

    #[test]
    fn test_resource_exhaustion() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();

        // 128 pages, 10 used by root; a 120-page image cannot fit
        assert_eq!(
            pm.create(Some(root.pid), "huge", 120).map(|p| p.pid),
            Err(SyscallError::ResourceExhausted)
        );
        assert_eq!(pm.free_pages(), 118);

        // Process table holds 8
        let mut kids = Vec::new();
        for _ in 0..7 {
            kids.push(pm.create(Some(root.pid), "kid", 0).unwrap());
        }
        assert_eq!(
            pm.create(Some(root.pid), "kid", 0).map(|p| p.pid),
            Err(SyscallError::ResourceExhausted)
        );
        assert_eq!(pm.count(), 8);
    }

    #[test]
    fn test_exited_parent_cannot_spawn() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();
        let child = pm.create(Some(root.pid), "child", 1).unwrap();
        pm.exit(child.pid, ExitStatus::Exited(0));
        assert_eq!(
            pm.create(Some(child.pid), "grandchild", 1).map(|p| p.pid),
            Err(SyscallError::NoProcess)
        );
    }

    #[test]
    fn test_abort_undoes_create() {
        let (_, pm) = setup();
        let before = pm.free_pages();
        let root = pm.create(None, "init", 1).unwrap();
        let child = pm.create(Some(root.pid), "child", 1).unwrap();

        pm.abort(child.pid);
        assert!(pm.children_of(root.pid).is_empty());
        assert_eq!(pm.free_pages(), before - 10);
        assert_eq!(pm.state(child.pid), Some(ProcessState::Reaped));
    }

    #[test]
    fn test_halt_only_from_root() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();
        let child = pm.create(Some(root.pid), "child", 1).unwrap();

        assert_eq!(pm.halt(child.pid), Err(SyscallError::PermissionDenied));
        assert!(pm.halt(root.pid).is_ok());
        assert!(pm.is_halted());
        assert_eq!(pm.wait_root(), None);
        assert_eq!(
            pm.create(Some(root.pid), "late", 1).map(|p| p.pid),
            Err(SyscallError::ResourceExhausted)
        );
    }

    #[test]
    fn test_wait_root_returns_root_status() {
        let (_, pm) = setup();
        let root = pm.create(None, "init", 1).unwrap();

        let pm2 = Arc::clone(&pm);
        let root_pid = root.pid;
        let exiter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            pm2.exit(root_pid, ExitStatus::Exited(3));
        });

        assert_eq!(pm.wait_root(), Some(ExitStatus::Exited(3)));
        exiter.join().unwrap();
        assert_eq!(pm.count(), 0);
    }
}

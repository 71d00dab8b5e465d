//! System call interface
//!
//! This is the boundary between user programs and the kernel. All file and
//! process operations go through these calls:
//! - Isolation: a process only reaches files through its own descriptors
//! - Validation: names, descriptors and images are checked here
//! - Tracing: every call is identified by a stable `SyscallNr`
//!
//! Calls are issued on behalf of a pid and may come from any thread; the
//! kernel is shared as `Arc<Kernel>` and every call is safe to run
//! concurrently.

use super::config::{ConfigError, KernelConfig};
use super::console::Console;
use super::executor::{Executor, ThreadExecutor};
use super::manager::ProcessManager;
use super::process::{ConsoleEnd, ExitStatus, Fd, OpenFile, Pid};
use super::program::{Program, ProgramLoader};
use super::registry::FileRegistry;
use super::user::UserContext;
use crate::vfs::BackingStore;
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

// ========== SYSCALL NUMBERS ==========

/// Syscall numbers
///
/// Stable identifiers used in trace records and by the ABI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SyscallNr {
    Halt = 0,
    Exit = 1,
    Exec = 2,
    Join = 3,
    Creat = 4,
    Open = 5,
    Read = 6,
    Write = 7,
    Close = 8,
    Unlink = 9,
}

impl SyscallNr {
    /// Get the syscall name (for tracing/debugging)
    pub fn name(&self) -> &'static str {
        match self {
            SyscallNr::Halt => "halt",
            SyscallNr::Exit => "exit",
            SyscallNr::Exec => "exec",
            SyscallNr::Join => "join",
            SyscallNr::Creat => "creat",
            SyscallNr::Open => "open",
            SyscallNr::Read => "read",
            SyscallNr::Write => "write",
            SyscallNr::Close => "close",
            SyscallNr::Unlink => "unlink",
        }
    }

    /// Get the syscall number
    pub fn num(&self) -> u32 {
        *self as u32
    }

    pub fn from_num(num: u32) -> Option<Self> {
        Some(match num {
            0 => SyscallNr::Halt,
            1 => SyscallNr::Exit,
            2 => SyscallNr::Exec,
            3 => SyscallNr::Join,
            4 => SyscallNr::Creat,
            5 => SyscallNr::Open,
            6 => SyscallNr::Read,
            7 => SyscallNr::Write,
            8 => SyscallNr::Close,
            9 => SyscallNr::Unlink,
            _ => return None,
        })
    }
}

impl std::fmt::Display for SyscallNr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.num())
    }
}

// ========== ERRORS ==========

/// System call error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyscallError {
    /// Empty, too long, or malformed filename
    #[error("invalid filename")]
    InvalidName,
    #[error("not found")]
    NotFound,
    #[error("bad file descriptor")]
    BadFd,
    /// Descriptor table is full
    #[error("too many open files")]
    TooManyOpenFiles,
    /// No process slot or not enough free pages
    #[error("resource exhausted")]
    ResourceExhausted,
    /// Join target is not a child of the caller
    #[error("not a child of the caller")]
    NotAChild,
    /// Another thread is already joining this child
    #[error("already being joined")]
    AlreadyJoined,
    /// Unknown image, or a name without the executable suffix
    #[error("bad executable image")]
    BadImage,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("permission denied")]
    PermissionDenied,
    /// The caller is not a running process
    #[error("no such process")]
    NoProcess,
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SyscallError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => SyscallError::NotFound,
            ErrorKind::PermissionDenied => SyscallError::PermissionDenied,
            ErrorKind::InvalidInput => SyscallError::InvalidArgument,
            _ => SyscallError::Io(e.to_string()),
        }
    }
}

pub type SyscallResult<T> = Result<T, SyscallError>;

/// Unwind payload carrying a program's exit() status to its process body
pub(crate) struct ExitRequest(pub i32);

// ========== KERNEL ==========

/// The kernel state - files, processes and the devices they share
pub struct Kernel {
    config: KernelConfig,
    /// System-wide open file state
    registry: Arc<FileRegistry>,
    processes: ProcessManager,
    /// Shared by every process's descriptors 0 and 1
    console: Arc<dyn Console>,
    loader: ProgramLoader,
    executor: Arc<dyn Executor>,
}

impl Kernel {
    /// A kernel that runs each process on its own thread
    pub fn new(
        config: KernelConfig,
        store: Arc<dyn BackingStore>,
        console: Arc<dyn Console>,
    ) -> Result<Arc<Self>, ConfigError> {
        Self::with_executor(config, store, console, Arc::new(ThreadExecutor))
    }

    pub fn with_executor(
        config: KernelConfig,
        store: Arc<dyn BackingStore>,
        console: Arc<dyn Console>,
        executor: Arc<dyn Executor>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let registry = Arc::new(FileRegistry::new(store, config.max_name_len));
        let processes = ProcessManager::new(&config, Arc::clone(&registry));
        Ok(Arc::new(Self {
            config,
            registry,
            processes,
            console,
            loader: ProgramLoader::new(),
            executor,
        }))
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn processes(&self) -> &ProcessManager {
        &self.processes
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        self.registry.store()
    }

    pub fn console(&self) -> &Arc<dyn Console> {
        &self.console
    }

    pub fn loader(&self) -> &ProgramLoader {
        &self.loader
    }

    /// Make an image available to exec
    pub fn register_program(&self, name: &str, program: Arc<dyn Program>) {
        self.loader.register(name, program);
    }

    // ========== PROCESS LIFECYCLE ==========

    /// Start the root process
    pub fn boot(self: &Arc<Self>, image: &str, args: &[String]) -> SyscallResult<Pid> {
        let program = self.resolve_image(image, args)?;
        self.spawn(None, image, program, args)
    }

    /// Boot and wait for the root process to finish
    ///
    /// Returns None if the machine was halted.
    pub fn run(self: &Arc<Self>, image: &str, args: &[String]) -> SyscallResult<Option<ExitStatus>> {
        self.boot(image, args)?;
        Ok(self.processes.wait_root())
    }

    fn resolve_image(&self, image: &str, args: &[String]) -> SyscallResult<Arc<dyn Program>> {
        if !image.ends_with(&self.config.image_suffix) || image.len() > self.config.max_name_len {
            warn!("exec rejected: {:?} is not a {} image", image, self.config.image_suffix);
            return Err(SyscallError::BadImage);
        }
        if args.iter().any(|a| a.len() > self.config.max_name_len) {
            warn!("exec rejected: argument to {} longer than {} bytes", image, self.config.max_name_len);
            return Err(SyscallError::InvalidArgument);
        }
        self.loader.load(image).ok_or_else(|| {
            warn!("exec rejected: no image named {}", image);
            SyscallError::BadImage
        })
    }

    fn spawn(
        self: &Arc<Self>,
        parent: Option<Pid>,
        image: &str,
        program: Arc<dyn Program>,
        args: &[String],
    ) -> SyscallResult<Pid> {
        let process = self.processes.create(parent, image, program.pages())?;
        let pid = process.pid;

        let kernel = Arc::clone(self);
        let args = args.to_vec();
        let job = Box::new(move || kernel.run_process(pid, program, args));

        if let Err(e) = self.executor.launch(pid, job) {
            warn!("could not start {}: {}", pid, e);
            self.processes.abort(pid);
            return Err(SyscallError::ResourceExhausted);
        }
        Ok(pid)
    }

    /// Process body: run the program, then post its exit
    fn run_process(self: Arc<Self>, pid: Pid, program: Arc<dyn Program>, args: Vec<String>) {
        let ctx = UserContext::new(Arc::clone(&self), pid);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| program.run(&ctx, &args)));

        let status = match outcome {
            Ok(code) => ExitStatus::Exited(code),
            Err(payload) => match payload.downcast::<ExitRequest>() {
                Ok(request) => ExitStatus::Exited(request.0),
                Err(_) => {
                    warn!("{} terminated abnormally", pid);
                    ExitStatus::Abnormal
                }
            },
        };
        self.processes.exit(pid, status);
    }

    // ========== SYSCALLS ==========

    /// Create (or truncate) a file and open it
    pub fn sys_creat(&self, pid: Pid, name: &str) -> SyscallResult<Fd> {
        let process = self.processes.process(pid)?;
        let mut files = process.files.lock();

        // Slot first: a full table must not create or truncate anything
        let fd = files.allocate_slot()?;
        match self.registry.create_or_truncate(name) {
            Ok((entry, store)) => {
                files.bind(fd, entry, store);
                Ok(fd)
            }
            Err(e) => {
                files.cancel(fd);
                Err(e)
            }
        }
    }

    /// Open an existing file
    pub fn sys_open(&self, pid: Pid, name: &str) -> SyscallResult<Fd> {
        let process = self.processes.process(pid)?;
        let mut files = process.files.lock();

        let fd = files.allocate_slot()?;
        match self.registry.open(name) {
            Ok((entry, store)) => {
                files.bind(fd, entry, store);
                Ok(fd)
            }
            Err(e) => {
                files.cancel(fd);
                Err(e)
            }
        }
    }

    /// Close a file descriptor
    pub fn sys_close(&self, pid: Pid, fd: Fd) -> SyscallResult<()> {
        let process = self.processes.process(pid)?;
        let file = process.files.lock().close_slot(fd)?;

        // Last reference to an unlinked file reclaims it here
        if let OpenFile::File { entry, .. } = file {
            self.registry.release(entry);
        }
        Ok(())
    }

    /// Remove a name; open descriptors keep the content until closed
    pub fn sys_unlink(&self, pid: Pid, name: &str) -> SyscallResult<()> {
        self.processes.process(pid)?;
        self.registry.mark_pending_delete(name)
    }

    /// Read from a descriptor at its cursor
    ///
    /// Returns fewer bytes than asked at end of content.
    pub fn sys_read(&self, pid: Pid, fd: Fd, buf: &mut [u8]) -> SyscallResult<usize> {
        let process = self.processes.process(pid)?;
        let mut files = process.files.lock();

        let file = files.get(fd)?;
        match file {
            OpenFile::Console(ConsoleEnd::Input) => {
                drop(files);
                Ok(self.console.read(buf)?)
            }
            OpenFile::Console(ConsoleEnd::Output) => Err(SyscallError::BadFd),
            OpenFile::File { store, cursor, .. } => {
                let mut done = 0;
                for chunk in buf.chunks_mut(self.config.page_size) {
                    let got = self.store().read_at(store, cursor + done as u64, chunk)?;
                    done += got;
                    // Short chunk: end of content
                    if got < chunk.len() {
                        break;
                    }
                }
                files.advance(fd, done)?;
                Ok(done)
            }
        }
    }

    /// Write to a descriptor at its cursor
    pub fn sys_write(&self, pid: Pid, fd: Fd, buf: &[u8]) -> SyscallResult<usize> {
        let process = self.processes.process(pid)?;
        let mut files = process.files.lock();

        let file = files.get(fd)?;
        match file {
            OpenFile::Console(ConsoleEnd::Output) => {
                drop(files);
                Ok(self.console.write(buf)?)
            }
            OpenFile::Console(ConsoleEnd::Input) => Err(SyscallError::BadFd),
            OpenFile::File {
                entry,
                store,
                cursor,
            } => {
                // One writer per file for the whole transfer
                let lock = self.registry.write_lock(entry).ok_or(SyscallError::BadFd)?;
                let _serialized = lock.lock();

                let mut done = 0;
                for chunk in buf.chunks(self.config.page_size) {
                    let wrote = self.store().write_at(store, cursor + done as u64, chunk)?;
                    done += wrote;
                    if wrote < chunk.len() {
                        break;
                    }
                }
                files.advance(fd, done)?;
                Ok(done)
            }
        }
    }

    /// Start a child process running `image`
    pub fn sys_exec(self: &Arc<Self>, pid: Pid, image: &str, args: &[String]) -> SyscallResult<Pid> {
        self.processes.process(pid)?;
        let program = self.resolve_image(image, args)?;
        self.spawn(Some(pid), image, program, args)
    }

    /// Wait for a child to exit and reap it
    pub fn sys_join(&self, pid: Pid, child: Pid) -> SyscallResult<ExitStatus> {
        self.processes.process(pid)?;
        self.processes.join(pid, child)
    }

    /// Terminate the calling program
    ///
    /// Must be called from the process's own thread: it unwinds the program
    /// body, which then posts `status` as the exit.
    pub fn sys_exit(&self, pid: Pid, status: i32) -> ! {
        debug!("{} calls exit({})", pid, status);
        panic::resume_unwind(Box::new(ExitRequest(status)))
    }

    /// Stop the machine (root process only)
    pub fn sys_halt(&self, pid: Pid) -> SyscallResult<()> {
        self.processes.process(pid)?;
        self.processes.halt(pid)
    }

    // ========== INTROSPECTION ==========

    /// A running process's open descriptors
    pub fn open_files(&self, pid: Pid) -> SyscallResult<Vec<(Fd, OpenFile)>> {
        let process = self.processes.process(pid)?;
        let files = process.files.lock();
        Ok(files.iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::console::MemoryConsole;
    use crate::kernel::program::program_fn;
    use crate::kernel::ProcessState;
    use crate::vfs::MemoryStore;

    /// A kernel with one root process that never runs a program body, so
    /// the test thread can issue syscalls on its behalf.
    fn setup() -> (Arc<Kernel>, Arc<MemoryConsole>, Pid) {
        let console = Arc::new(MemoryConsole::new());
        let kernel = Kernel::new(
            KernelConfig::default(),
            Arc::new(MemoryStore::new()),
            console.clone(),
        )
        .unwrap();
        let root = kernel.processes().create(None, "test.coff", 1).unwrap();
        (kernel, console, root.pid)
    }

    #[test]
    fn test_syscall_numbers() {
        assert_eq!(SyscallNr::Halt.num(), 0);
        assert_eq!(SyscallNr::Unlink.num(), 9);
        assert_eq!(SyscallNr::from_num(6), Some(SyscallNr::Read));
        assert_eq!(SyscallNr::from_num(10), None);
        assert_eq!(SyscallNr::Creat.to_string(), "creat(4)");
    }

    #[test]
    fn test_io_error_mapping() {
        let e = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(SyscallError::from(e), SyscallError::NotFound);
        let e = std::io::Error::other("disk on fire");
        assert!(matches!(SyscallError::from(e), SyscallError::Io(_)));
    }

    #[test]
    fn test_creat_write_read() {
        let (kernel, _, pid) = setup();
        let fd = kernel.sys_creat(pid, "data.txt").unwrap();
        assert_eq!(fd, Fd(2));
        assert_eq!(kernel.sys_write(pid, fd, b"hello, kernel").unwrap(), 13);
        kernel.sys_close(pid, fd).unwrap();

        let fd = kernel.sys_open(pid, "data.txt").unwrap();
        let mut buf = [0u8; 64];
        let n = kernel.sys_read(pid, fd, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello, kernel");
        // Cursor is at the end now
        assert_eq!(kernel.sys_read(pid, fd, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_multi_page_transfer() {
        let (kernel, _, pid) = setup();
        let data: Vec<u8> = (0..2560u32).map(|i| (i % 251) as u8).collect();

        let fd = kernel.sys_creat(pid, "big").unwrap();
        assert_eq!(kernel.sys_write(pid, fd, &data).unwrap(), data.len());
        kernel.sys_close(pid, fd).unwrap();

        let fd = kernel.sys_open(pid, "big").unwrap();
        let mut buf = vec![0u8; 4096];
        let n = kernel.sys_read(pid, fd, &mut buf).unwrap();
        assert_eq!(n, 2560);
        assert_eq!(&buf[..n], &data[..]);
    }

    #[test]
    fn test_console_descriptors() {
        let (kernel, console, pid) = setup();
        console.push_input(b"typed");

        let mut buf = [0u8; 8];
        let n = kernel.sys_read(pid, Fd::STDIN, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"typed");
        assert_eq!(kernel.sys_write(pid, Fd::STDOUT, b"shown").unwrap(), 5);
        assert_eq!(console.take_output(), b"shown");

        // Wrong direction
        assert_eq!(kernel.sys_write(pid, Fd::STDIN, b"x"), Err(SyscallError::BadFd));
        assert_eq!(kernel.sys_read(pid, Fd::STDOUT, &mut buf), Err(SyscallError::BadFd));
    }

    #[test]
    fn test_closed_console_slot_is_reused() {
        let (kernel, _, pid) = setup();
        kernel.sys_close(pid, Fd::STDOUT).unwrap();
        assert_eq!(kernel.sys_write(pid, Fd::STDOUT, b"x"), Err(SyscallError::BadFd));
        assert_eq!(kernel.sys_close(pid, Fd::STDOUT), Err(SyscallError::BadFd));

        // Lowest free slot wins
        assert_eq!(kernel.sys_creat(pid, "f").unwrap(), Fd::STDOUT);
    }

    #[test]
    fn test_full_table_creates_nothing() {
        let (kernel, _, pid) = setup();
        for i in 0..14 {
            kernel.sys_creat(pid, &format!("f{}", i)).unwrap();
        }
        assert_eq!(kernel.sys_creat(pid, "extra"), Err(SyscallError::TooManyOpenFiles));
        assert!(!kernel.store().exists("extra"));
        assert_eq!(kernel.sys_open(pid, "f0"), Err(SyscallError::TooManyOpenFiles));
    }

    #[test]
    fn test_failed_open_releases_slot() {
        let (kernel, _, pid) = setup();
        assert_eq!(kernel.sys_open(pid, "missing"), Err(SyscallError::NotFound));
        assert_eq!(kernel.sys_creat(pid, ""), Err(SyscallError::InvalidName));
        assert_eq!(kernel.sys_creat(pid, "ok").unwrap(), Fd(2));
    }

    /// A store that stalls before writing any chunk of 'A's past the first
    /// page, leaving a window for a competing writer
    struct StallingStore {
        inner: MemoryStore,
    }

    impl BackingStore for StallingStore {
        fn create(&self, name: &str) -> std::io::Result<crate::vfs::StoreHandle> {
            self.inner.create(name)
        }
        fn open(&self, name: &str) -> std::io::Result<crate::vfs::StoreHandle> {
            self.inner.open(name)
        }
        fn read_at(
            &self,
            handle: crate::vfs::StoreHandle,
            offset: u64,
            buf: &mut [u8],
        ) -> std::io::Result<usize> {
            self.inner.read_at(handle, offset, buf)
        }
        fn write_at(
            &self,
            handle: crate::vfs::StoreHandle,
            offset: u64,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            if offset > 0 && buf.first() == Some(&b'A') {
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
            self.inner.write_at(handle, offset, buf)
        }
        fn truncate(&self, handle: crate::vfs::StoreHandle) -> std::io::Result<()> {
            self.inner.truncate(handle)
        }
        fn len(&self, handle: crate::vfs::StoreHandle) -> std::io::Result<u64> {
            self.inner.len(handle)
        }
        fn detach(&self, name: &str) -> std::io::Result<crate::vfs::StoreHandle> {
            self.inner.detach(name)
        }
        fn reclaim(&self, handle: crate::vfs::StoreHandle) -> std::io::Result<()> {
            self.inner.reclaim(handle)
        }
        fn exists(&self, name: &str) -> bool {
            self.inner.exists(name)
        }
        fn names(&self) -> Vec<String> {
            self.inner.names()
        }
    }

    #[test]
    fn test_concurrent_multi_page_writes_do_not_interleave() {
        let store = Arc::new(StallingStore {
            inner: MemoryStore::new(),
        });
        let kernel = Kernel::new(
            KernelConfig::default(),
            store,
            Arc::new(MemoryConsole::new()),
        )
        .unwrap();
        let a = kernel.processes().create(None, "a.coff", 1).unwrap().pid;
        let b = kernel.processes().create(Some(a), "b.coff", 1).unwrap().pid;
        let fd_a = kernel.sys_creat(a, "shared").unwrap();
        let fd_b = kernel.sys_open(b, "shared").unwrap();

        let writer = {
            let kernel = Arc::clone(&kernel);
            std::thread::spawn(move || kernel.sys_write(a, fd_a, &[b'A'; 2048]))
        };
        // Let A finish its first page and stall before the second
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(kernel.sys_write(b, fd_b, &[b'B'; 2048]), Ok(2048));
        assert_eq!(writer.join().unwrap(), Ok(2048));

        let fd = kernel.sys_open(a, "shared").unwrap();
        let mut buf = vec![0u8; 2048];
        assert_eq!(kernel.sys_read(a, fd, &mut buf), Ok(2048));
        let (first, second) = buf.split_at(1024);
        assert!(
            first.iter().chain(second).all(|&c| c == first[0]),
            "mixed payloads: first half {} second half {}",
            first[0] as char,
            second[0] as char
        );
    }

    #[test]
    fn test_unlink_while_open() {
        let (kernel, _, pid) = setup();
        let fd = kernel.sys_creat(pid, "doomed").unwrap();
        kernel.sys_write(pid, fd, b"still here").unwrap();
        kernel.sys_unlink(pid, "doomed").unwrap();

        assert_eq!(kernel.sys_open(pid, "doomed"), Err(SyscallError::NotFound));
        assert_eq!(kernel.sys_write(pid, fd, b"!").unwrap(), 1);

        kernel.sys_close(pid, fd).unwrap();
        assert_eq!(kernel.registry().live_entries(), 0);
        assert_eq!(kernel.sys_open(pid, "doomed"), Err(SyscallError::NotFound));
        assert_eq!(kernel.sys_unlink(pid, "doomed"), Err(SyscallError::NotFound));
    }

    #[test]
    fn test_exec_validates_image() {
        let (kernel, _, pid) = setup();
        kernel.register_program("noop.coff", program_fn(1, |_, _| 0));
        kernel.register_program("noop.elf", program_fn(1, |_, _| 0));

        assert_eq!(kernel.sys_exec(pid, "noop.elf", &[]), Err(SyscallError::BadImage));
        assert_eq!(kernel.sys_exec(pid, "ghost.coff", &[]), Err(SyscallError::BadImage));
        let long_arg = vec!["a".repeat(300)];
        assert_eq!(
            kernel.sys_exec(pid, "noop.coff", &long_arg),
            Err(SyscallError::InvalidArgument)
        );

        let child = kernel.sys_exec(pid, "noop.coff", &[]).unwrap();
        assert_eq!(kernel.sys_join(pid, child), Ok(ExitStatus::Exited(0)));
    }

    #[test]
    fn test_panicking_program_exits_abnormally() {
        let (kernel, _, pid) = setup();
        kernel.register_program(
            "crash.coff",
            program_fn(1, |ctx, _| {
                ctx.creat("left-open");
                panic!("simulated fault");
            }),
        );

        let child = kernel.sys_exec(pid, "crash.coff", &[]).unwrap();
        assert_eq!(kernel.sys_join(pid, child), Ok(ExitStatus::Abnormal));
        assert_eq!(kernel.registry().live_entries(), 0);
    }

    #[test]
    fn test_exit_status_from_exit_call() {
        let (kernel, _, pid) = setup();
        kernel.register_program("quit.coff", program_fn(1, |ctx, _| ctx.exit(17)));

        let child = kernel.sys_exec(pid, "quit.coff", &[]).unwrap();
        assert_eq!(kernel.sys_join(pid, child), Ok(ExitStatus::Exited(17)));
        assert_eq!(kernel.processes().state(child), Some(ProcessState::Reaped));
    }

    #[test]
    fn test_calls_from_unknown_process() {
        let (kernel, _, _) = setup();
        assert_eq!(kernel.sys_creat(Pid(77), "x"), Err(SyscallError::NoProcess));
        assert_eq!(kernel.sys_close(Pid(77), Fd(2)), Err(SyscallError::NoProcess));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = KernelConfig {
            max_open_files: 2,
            ..KernelConfig::default()
        };
        let result = Kernel::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryConsole::new()),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}

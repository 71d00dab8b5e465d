//! User-level syscall ABI
//!
//! What a running program sees. Every call returns a non-negative value on
//! success and -1 on failure; the typed error is logged, not returned.

use super::process::{ExitStatus, Fd, Pid};
use super::syscall::{Kernel, SyscallNr, SyscallResult};
use log::{debug, trace};
use std::sync::Arc;

/// A process's handle on the kernel
pub struct UserContext {
    kernel: Arc<Kernel>,
    pid: Pid,
}

impl UserContext {
    pub fn new(kernel: Arc<Kernel>, pid: Pid) -> Self {
        Self { kernel, pid }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    /// Collapse a typed result to the ABI's integer convention
    fn abi<T>(&self, nr: SyscallNr, result: SyscallResult<T>, ok: impl FnOnce(T) -> i32) -> i32 {
        match result {
            Ok(value) => {
                let ret = ok(value);
                trace!("{} {} = {}", self.pid, nr, ret);
                ret
            }
            Err(e) => {
                debug!("{} {} failed: {}", self.pid, nr, e);
                -1
            }
        }
    }

    fn fd(fd: i32) -> Option<Fd> {
        u32::try_from(fd).ok().map(Fd)
    }

    /// Create or truncate `name`; returns the new descriptor
    pub fn creat(&self, name: &str) -> i32 {
        let result = self.kernel.sys_creat(self.pid, name);
        self.abi(SyscallNr::Creat, result, |fd| fd.0 as i32)
    }

    /// Open an existing file; returns the new descriptor
    pub fn open(&self, name: &str) -> i32 {
        let result = self.kernel.sys_open(self.pid, name);
        self.abi(SyscallNr::Open, result, |fd| fd.0 as i32)
    }

    pub fn close(&self, fd: i32) -> i32 {
        let Some(fd) = Self::fd(fd) else {
            return -1;
        };
        let result = self.kernel.sys_close(self.pid, fd);
        self.abi(SyscallNr::Close, result, |_| 0)
    }

    pub fn unlink(&self, name: &str) -> i32 {
        let result = self.kernel.sys_unlink(self.pid, name);
        self.abi(SyscallNr::Unlink, result, |_| 0)
    }

    /// Read up to `count` bytes into the front of `buf`
    pub fn read(&self, fd: i32, buf: &mut [u8], count: usize) -> i32 {
        let (Some(fd), Some(buf)) = (Self::fd(fd), buf.get_mut(..count)) else {
            return -1;
        };
        let result = self.kernel.sys_read(self.pid, fd, buf);
        self.abi(SyscallNr::Read, result, |n| n as i32)
    }

    /// Write the first `count` bytes of `buf`
    pub fn write(&self, fd: i32, buf: &[u8], count: usize) -> i32 {
        let (Some(fd), Some(buf)) = (Self::fd(fd), buf.get(..count)) else {
            return -1;
        };
        let result = self.kernel.sys_write(self.pid, fd, buf);
        self.abi(SyscallNr::Write, result, |n| n as i32)
    }

    /// Start a child; returns its pid
    pub fn exec(&self, image: &str, args: &[&str]) -> i32 {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let result = self.kernel.sys_exec(self.pid, image, &args);
        self.abi(SyscallNr::Exec, result, |pid| pid.0 as i32)
    }

    /// Wait for a child
    ///
    /// Returns 1 and stores the status if the child exited normally, 0 if
    /// it terminated abnormally (status untouched), -1 on error.
    pub fn join(&self, pid: i32, status: &mut i32) -> i32 {
        let Ok(child) = u32::try_from(pid) else {
            return -1;
        };
        let result = self.kernel.sys_join(self.pid, Pid(child));
        self.abi(SyscallNr::Join, result, |exit| match exit {
            ExitStatus::Exited(code) => {
                *status = code;
                1
            }
            ExitStatus::Abnormal => 0,
        })
    }

    /// Terminate the calling program
    pub fn exit(&self, status: i32) -> ! {
        trace!("{} {}", self.pid, SyscallNr::Exit);
        self.kernel.sys_exit(self.pid, status)
    }

    /// Stop the machine; only the root process may
    pub fn halt(&self) -> i32 {
        let result = self.kernel.sys_halt(self.pid);
        self.abi(SyscallNr::Halt, result, |_| 0)
    }
}

//! Process executor
//!
//! The kernel hands every new process to an executor as a job that runs
//! the program to completion and posts its exit. The default executor
//! gives each process its own OS thread, so processes really do run in
//! parallel and a blocked `join` parks only its own thread.

use super::process::Pid;
use std::io;
use std::thread;

/// A process body, ready to run
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run process bodies
pub trait Executor: Send + Sync {
    /// Start running `job` for process `pid`. An error means the process
    /// never started.
    fn launch(&self, pid: Pid, job: Job) -> io::Result<()>;
}

/// One OS thread per process
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn launch(&self, pid: Pid, job: Job) -> io::Result<()> {
        thread::Builder::new()
            .name(pid.to_string())
            .spawn(job)
            .map(|_| ())
    }
}

//! Console device
//!
//! Descriptors 0 and 1 of every process talk to the console rather than
//! the backing store. The kernel only needs byte-level read and write;
//! where those bytes come from is up to the implementation.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// A console shared by all processes
pub trait Console: Send + Sync {
    /// Read available input. Returns 0 when there is none.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write output
    fn write(&self, buf: &[u8]) -> io::Result<usize>;
}

/// A console backed by in-memory buffers
///
/// Input is pushed by the host, output is collected for inspection.
pub struct MemoryConsole {
    /// Input buffer (keyboard input)
    input: Mutex<VecDeque<u8>>,
    /// Output buffer (for display)
    output: Mutex<Vec<u8>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(VecDeque::new()),
            output: Mutex::new(Vec::new()),
        }
    }

    /// Push keyboard input
    pub fn push_input(&self, data: &[u8]) {
        self.input.lock().extend(data);
    }

    /// Take output (for rendering)
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut *self.output.lock())
    }

    /// Copy of the output without consuming it
    pub fn peek_output(&self) -> Vec<u8> {
        self.output.lock().clone()
    }
}

impl Default for MemoryConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for MemoryConsole {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut input = self.input.lock();
        let to_read = buf.len().min(input.len());
        for (i, byte) in input.drain(..to_read).enumerate() {
            buf[i] = byte;
        }
        Ok(to_read)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.output.lock().extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// The host's stdin/stdout
pub struct StdioConsole;

impl Console for StdioConsole {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().lock().read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(buf)?;
        stdout.flush()?;
        Ok(buf.len())
    }
}

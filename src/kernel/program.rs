//! Program images
//!
//! A program is what `exec` runs: an entry point that receives the
//! process's syscall interface and its argument vector and returns an
//! exit status. Images are registered by name with the loader before any
//! process asks for them; the loader stands in for reading an executable
//! off disk.

use super::user::UserContext;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// An executable image
pub trait Program: Send + Sync + 'static {
    /// Pages the loaded image occupies, not counting stack and arguments
    fn pages(&self) -> usize {
        1
    }

    /// The program's main. The return value is its exit status.
    fn run(&self, ctx: &UserContext, args: &[String]) -> i32;
}

/// A program defined by a closure
pub struct FnProgram<F> {
    pages: usize,
    main: F,
}

impl<F> Program for FnProgram<F>
where
    F: Fn(&UserContext, &[String]) -> i32 + Send + Sync + 'static,
{
    fn pages(&self) -> usize {
        self.pages
    }

    fn run(&self, ctx: &UserContext, args: &[String]) -> i32 {
        (self.main)(ctx, args)
    }
}

/// Wrap a closure as a program image
pub fn program_fn<F>(pages: usize, main: F) -> Arc<dyn Program>
where
    F: Fn(&UserContext, &[String]) -> i32 + Send + Sync + 'static,
{
    Arc::new(FnProgram { pages, main })
}

/// Registered images, by name
pub struct ProgramLoader {
    images: RwLock<HashMap<String, Arc<dyn Program>>>,
}

impl ProgramLoader {
    pub fn new() -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
        }
    }

    /// Register an image, replacing any previous one with the same name
    pub fn register(&self, name: &str, program: Arc<dyn Program>) {
        self.images.write().insert(name.to_string(), program);
    }

    pub fn load(&self, name: &str) -> Option<Arc<dyn Program>> {
        self.images.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.images.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProgramLoader {
    fn default() -> Self {
        Self::new()
    }
}

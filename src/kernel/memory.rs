//! Physical memory
//!
//! A fixed pool of page frames. Every process holds the frames for its
//! image, stack and argument page from spawn until exit; exit hands them
//! back. There is no paging: when the pool runs dry, spawn fails.

/// Physical page frame number
pub type PageNumber = usize;

/// The free-frame list
#[derive(Debug)]
pub struct PagePool {
    free: Vec<PageNumber>,
    total: usize,
}

impl PagePool {
    /// A pool of `total` frames, all free
    pub fn new(total: usize) -> Self {
        Self {
            // Hand out low frames first
            free: (0..total).rev().collect(),
            total,
        }
    }

    /// Take `count` frames, or none at all if the pool is short
    pub fn alloc(&mut self, count: usize) -> Option<Vec<PageNumber>> {
        if count > self.free.len() {
            return None;
        }
        let at = self.free.len() - count;
        Some(self.free.split_off(at))
    }

    /// Return frames to the pool
    pub fn release(&mut self, pages: Vec<PageNumber>) {
        debug_assert!(pages.iter().all(|p| *p < self.total && !self.free.contains(p)));
        self.free.extend(pages);
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

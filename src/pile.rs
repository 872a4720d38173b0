//! The pile of pending packages: a single FIFO drained head-first.
//!
//! The pile carries no lock of its own. It lives inside the grab-lock
//! (see `turns::TurnBoard`), which is the only place it is ever touched.

use std::collections::VecDeque;

use crate::types::Package;

#[derive(Debug, Default)]
pub struct PackagePile {
    queue: VecDeque<Package>,
}

impl PackagePile {
    /// Build a pile in insertion order; the first package is the head.
    pub fn new(packages: impl IntoIterator<Item = Package>) -> Self {
        Self {
            queue: packages.into_iter().collect(),
        }
    }

    /// Detach the head and advance; `None` means the pile is exhausted.
    pub fn try_extract_head(&mut self) -> Option<Package> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

//! Atomic occupancy probes used to catch exclusivity violations at runtime.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Tracks how many holders each slot has; a slot with two holders is a violation.
pub struct ExclusivityProbe {
    occupancy: AtomicUsize,
    max_occupancy: AtomicUsize,
    violation: AtomicBool,
    per_slot: Vec<AtomicUsize>,
}

impl ExclusivityProbe {
    pub fn new(slots: usize) -> Self {
        Self {
            occupancy: AtomicUsize::new(0),
            max_occupancy: AtomicUsize::new(0),
            violation: AtomicBool::new(false),
            per_slot: (0..slots).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn enter(&self, slot: usize) {
        let current = self.occupancy.fetch_add(1, Ordering::SeqCst) + 1;
        let slot_count = self.per_slot[slot].fetch_add(1, Ordering::SeqCst) + 1;
        if slot_count > 1 {
            self.violation.store(true, Ordering::SeqCst);
        }
        let mut prev = self.max_occupancy.load(Ordering::SeqCst);
        while current > prev {
            match self.max_occupancy.compare_exchange(
                prev,
                current,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(next) => prev = next,
            }
        }
    }

    pub fn leave(&self, slot: usize) {
        let slot_prev = self.per_slot[slot].fetch_sub(1, Ordering::SeqCst);
        debug_assert!(slot_prev > 0, "slot counter underflow");
        let occ_prev = self.occupancy.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(occ_prev > 0, "occupancy counter underflow");
    }

    /// Most slots held at once, across all slots.
    pub fn max_occupancy(&self) -> usize {
        self.max_occupancy.load(Ordering::SeqCst)
    }

    pub fn has_violation(&self) -> bool {
        self.violation.load(Ordering::SeqCst)
    }
}

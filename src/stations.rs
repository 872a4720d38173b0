//! Exclusive-use stations shared by every robot on the floor.
//!
//! All four stations share one mutex and one condvar. A release broadcasts
//! to every waiter and each re-checks only the station it wants.

use std::sync::{Condvar, Mutex};

use log::debug;

use crate::types::{STATION_COUNT, Seat, StationKind};

pub struct StationPool {
    occupants: Mutex<[Option<Seat>; STATION_COUNT]>,
    changed: Condvar,
}

/// Tenure on one station. Must be handed back through `StationPool::release`.
#[must_use = "a station stays occupied until its handle is released"]
#[derive(Debug)]
pub struct StationHandle {
    kind: StationKind,
    holder: Seat,
}

impl StationPool {
    pub fn new() -> Self {
        Self {
            occupants: Mutex::new([None; STATION_COUNT]),
            changed: Condvar::new(),
        }
    }

    /// Block until `kind` is free, then occupy it on behalf of `robot`.
    pub fn acquire(&self, kind: StationKind, robot: Seat) -> StationHandle {
        let mut guard = self.occupants.lock().expect("station mutex poisoned");
        let mut announced = false;
        loop {
            let slot = &mut guard[kind.index()];
            if slot.is_none() {
                *slot = Some(robot);
                return StationHandle {
                    kind,
                    holder: robot,
                };
            }
            if !announced {
                debug!("[WAIT] station {kind} is busy, robot {robot} waiting");
                announced = true;
            }
            guard = self.changed.wait(guard).expect("condvar wait failed");
        }
    }

    /// Free the station and wake every robot waiting on any station.
    pub fn release(&self, handle: StationHandle) {
        let mut guard = self.occupants.lock().expect("station mutex poisoned");
        let slot = &mut guard[handle.kind.index()];
        match *slot {
            Some(owner) if owner == handle.holder => {
                *slot = None;
                debug!("[FREE] station {} is now free", handle.kind);
                self.changed.notify_all();
            }
            Some(owner) => panic!(
                "station {} released by non-holder {} (held by {owner})",
                handle.kind, handle.holder
            ),
            None => panic!(
                "station {} released by {} while already free",
                handle.kind, handle.holder
            ),
        }
    }

    pub fn occupied_stations(&self) -> Vec<StationKind> {
        let guard = self.occupants.lock().expect("station mutex poisoned");
        StationKind::ALL
            .into_iter()
            .filter(|kind| guard[kind.index()].is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Team;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn station_is_exclusive_under_contention() {
        let pool = Arc::new(StationPool::new());
        let contenders = 8;
        let barrier = Arc::new(Barrier::new(contenders));
        let occupancy = Arc::new(AtomicUsize::new(0));
        let violation = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for robot in 1..=contenders {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);
            let occupancy = Arc::clone(&occupancy);
            let violation = Arc::clone(&violation);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for _ in 0..5 {
                    let handle = pool.acquire(StationKind::Jostle, Seat::new(Team::Blue, robot));
                    if occupancy.fetch_add(1, Ordering::SeqCst) > 0 {
                        violation.store(true, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_millis(1));
                    occupancy.fetch_sub(1, Ordering::SeqCst);
                    pool.release(handle);
                }
            }));
        }

        for handle in handles {
            handle.join().expect("station thread panicked");
        }
        assert!(!violation.load(Ordering::SeqCst));
        assert!(pool.occupied_stations().is_empty());
    }

    #[test]
    fn distinct_stations_do_not_block_each_other() {
        let pool = StationPool::new();
        let seat = Seat::new(Team::Red, 1);
        let handles: Vec<_> = StationKind::ALL
            .into_iter()
            .map(|kind| pool.acquire(kind, seat))
            .collect();
        assert_eq!(pool.occupied_stations(), StationKind::ALL.to_vec());
        for handle in handles {
            pool.release(handle);
        }
        assert!(pool.occupied_stations().is_empty());
    }

    #[test]
    fn waiter_wakes_when_its_station_is_released() {
        let pool = Arc::new(StationPool::new());
        let held = pool.acquire(StationKind::XRay, Seat::new(Team::Green, 1));
        let (done_tx, done_rx) = mpsc::channel();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let handle = pool.acquire(StationKind::XRay, Seat::new(Team::Yellow, 1));
                done_tx.send(handle.holder).expect("done");
                pool.release(handle);
            })
        };

        // Releasing an unrelated station wakes the waiter, which must go back to sleep.
        let other = pool.acquire(StationKind::Weigh, Seat::new(Team::Green, 2));
        pool.release(other);
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

        pool.release(held);
        let holder = done_rx.recv_timeout(Duration::from_secs(1)).expect("waiter acquired");
        assert_eq!(holder, Seat::new(Team::Yellow, 1));
        waiter.join().expect("waiter panicked");
    }

    #[test]
    #[should_panic(expected = "already free")]
    fn double_release_panics() {
        let pool = StationPool::new();
        let seat = Seat::new(Team::Blue, 1);
        pool.release(StationHandle {
            kind: StationKind::Weigh,
            holder: seat,
        });
    }

    #[test]
    #[should_panic(expected = "non-holder")]
    fn release_by_non_holder_panics() {
        let pool = StationPool::new();
        let _held = pool.acquire(StationKind::Barcode, Seat::new(Team::Blue, 1));
        pool.release(StationHandle {
            kind: StationKind::Barcode,
            holder: Seat::new(Team::Blue, 2),
        });
    }
}

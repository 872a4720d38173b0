//! Per-team turn rings guarded by the shared grab-lock.
//!
//! One mutex (the grab-lock) covers the package pile and every robot's
//! active flag. Each team has its own condvar on that mutex, so a hand-off
//! only wakes members of the team it concerns.

use std::sync::{Condvar, Mutex, MutexGuard};

use log::debug;

use crate::pile::PackagePile;
use crate::types::{Package, RobotId, Seat, Team};

struct GrabState {
    pile: PackagePile,
    // rings[team][robot - 1]: true while that robot may take the next package.
    rings: Vec<Vec<bool>>,
}

impl GrabState {
    fn flag(&mut self, seat: Seat) -> &mut bool {
        &mut self.rings[seat.team.index()][seat.robot - 1]
    }

    fn is_active(&self, seat: Seat) -> bool {
        self.rings[seat.team.index()][seat.robot - 1]
    }
}

pub struct TurnBoard {
    state: Mutex<GrabState>,
    team_wake: Vec<Condvar>,
    robots_per_team: usize,
}

/// Proof that `seat` is active; the grab-lock stays held until it is consumed.
pub struct Turn<'a> {
    board: &'a TurnBoard,
    guard: MutexGuard<'a, GrabState>,
    seat: Seat,
}

impl TurnBoard {
    /// One ring of `robots_per_team` per team; robot #1 of each ring starts active.
    pub fn new(pile: PackagePile, teams: usize, robots_per_team: usize) -> Self {
        debug_assert!(teams > 0 && teams <= Team::ALL.len(), "team count out of range");
        debug_assert!(robots_per_team > 0, "empty ring");
        let rings = (0..teams)
            .map(|_| (0..robots_per_team).map(|i| i == 0).collect())
            .collect();
        Self {
            state: Mutex::new(GrabState { pile, rings }),
            team_wake: (0..teams).map(|_| Condvar::new()).collect(),
            robots_per_team,
        }
    }

    /// Every seat on the board, team by team, ring order within a team.
    pub fn seats(&self) -> Vec<Seat> {
        Team::ALL[..self.team_wake.len()]
            .iter()
            .flat_map(|&team| (1..=self.robots_per_team).map(move |robot| Seat::new(team, robot)))
            .collect()
    }

    /// Ring successor, wrapping the last robot back to the first.
    pub fn successor(&self, robot: RobotId) -> RobotId {
        robot % self.robots_per_team + 1
    }

    /// Block until `seat` is active. `None` once the pile is empty.
    pub fn wait_for_turn(&self, seat: Seat) -> Option<Turn<'_>> {
        let mut guard = self.state.lock().expect("grab mutex poisoned");
        let mut announced = false;
        loop {
            if guard.pile.is_empty() {
                return None;
            }
            if guard.is_active(seat) {
                return Some(Turn {
                    board: self,
                    guard,
                    seat,
                });
            }
            if !announced {
                debug!("[BUSY] currently not robot {seat}'s turn");
                announced = true;
            }
            guard = self.team_wake[seat.team.index()]
                .wait(guard)
                .expect("condvar wait failed");
        }
    }

    /// Hand the turn to the next robot in `seat`'s ring and wake its team.
    pub fn pass_turn(&self, seat: Seat) {
        let mut guard = self.state.lock().expect("grab mutex poisoned");
        let ring = &guard.rings[seat.team.index()];
        if let Some(holder) = ring.iter().position(|&active| active) {
            panic!(
                "turn passed by {seat} while {} #{} is still active",
                seat.team,
                holder + 1
            );
        }
        let next = Seat::new(seat.team, self.successor(seat.robot));
        *guard.flag(next) = true;
        debug!("[TURN] {seat} hands the turn to {next}");
        self.team_wake[seat.team.index()].notify_all();
    }

    /// Number of active robots in `team`; at most one at any instant.
    pub fn active_count(&self, team: Team) -> usize {
        let guard = self.state.lock().expect("grab mutex poisoned");
        guard.rings[team.index()].iter().filter(|&&a| a).count()
    }

    /// Packages still waiting in the pile.
    pub fn remaining(&self) -> usize {
        let guard = self.state.lock().expect("grab mutex poisoned");
        guard.pile.len()
    }

    // Called with the grab-lock held; blocked waiters re-check and see the empty pile.
    fn wake_all_teams(&self) {
        for wake in &self.team_wake {
            wake.notify_all();
        }
    }
}

impl Turn<'_> {
    /// Take the head package and give up the active flag.
    pub fn grab(mut self) -> Option<Package> {
        assert!(
            self.guard.is_active(self.seat),
            "grab attempted by inactive robot {}",
            self.seat
        );
        let package = self.guard.pile.try_extract_head();
        if package.is_some() {
            *self.guard.flag(self.seat) = false;
        }
        if self.guard.pile.is_empty() {
            self.board.wake_all_teams();
        }
        package
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StationKind;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn pile(count: u64) -> PackagePile {
        PackagePile::new((1..=count).map(|id| Package::new(id, vec![StationKind::Barcode], false)))
    }

    #[test]
    fn first_robot_of_each_ring_starts_active() {
        let board = TurnBoard::new(pile(1), 4, 3);
        for team in Team::ALL {
            assert_eq!(board.active_count(team), 1);
        }
        assert!(board.wait_for_turn(Seat::new(Team::Red, 1)).is_some());
        assert_eq!(board.seats().len(), 12);
    }

    #[test]
    fn successor_wraps_to_first() {
        let board = TurnBoard::new(pile(0), 1, 3);
        assert_eq!(board.successor(1), 2);
        assert_eq!(board.successor(3), 1);
        let solo = TurnBoard::new(pile(0), 1, 1);
        assert_eq!(solo.successor(1), 1);
    }

    #[test]
    fn grab_clears_flag_and_pass_activates_successor() {
        let board = TurnBoard::new(pile(3), 1, 2);
        let first = Seat::new(Team::Blue, 1);
        let turn = board.wait_for_turn(first).expect("first robot active");
        assert_eq!(turn.grab().map(|p| p.id), Some(1));
        assert_eq!(board.active_count(Team::Blue), 0);

        board.pass_turn(first);
        assert_eq!(board.active_count(Team::Blue), 1);
        let second = board
            .wait_for_turn(Seat::new(Team::Blue, 2))
            .expect("second robot active");
        assert_eq!(second.grab().map(|p| p.id), Some(2));
        assert_eq!(board.remaining(), 1);
    }

    #[test]
    fn blocked_teammate_wakes_on_pass() {
        let board = Arc::new(TurnBoard::new(pile(2), 1, 2));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let first = Seat::new(Team::Blue, 1);
        let turn = board.wait_for_turn(first).expect("first active");
        turn.grab().expect("package 1");

        let waiter = {
            let board = Arc::clone(&board);
            thread::spawn(move || {
                ready_tx.send(()).expect("ready");
                let package = board
                    .wait_for_turn(Seat::new(Team::Blue, 2))
                    .and_then(|turn| turn.grab());
                done_tx.send(package.map(|p| p.id)).expect("done");
            })
        };

        ready_rx.recv_timeout(Duration::from_secs(1)).expect("ready");
        // The waiter must still be parked: nobody is active yet.
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
        board.pass_turn(first);

        let got = done_rx.recv_timeout(Duration::from_secs(1)).expect("waiter woke");
        assert_eq!(got, Some(2));
        waiter.join().expect("waiter panicked");
    }

    #[test]
    fn empty_pile_releases_every_waiter() {
        let board = TurnBoard::new(pile(0), 4, 5);
        for seat in board.seats() {
            assert!(board.wait_for_turn(seat).is_none());
        }
    }

    #[test]
    fn waiters_of_other_teams_exit_when_pile_drains() {
        let board = Arc::new(TurnBoard::new(pile(1), 2, 2));
        let (done_tx, done_rx) = mpsc::channel();

        // Red #2 is never activated; it must still exit once Blue drains the pile.
        let waiter = {
            let board = Arc::clone(&board);
            thread::spawn(move || {
                let turn = board.wait_for_turn(Seat::new(Team::Red, 2));
                done_tx.send(turn.is_none()).expect("done");
            })
        };

        thread::sleep(Duration::from_millis(20));
        let turn = board.wait_for_turn(Seat::new(Team::Blue, 1)).expect("blue active");
        assert!(turn.grab().is_some());

        let exited = done_rx.recv_timeout(Duration::from_secs(1)).expect("waiter exited");
        assert!(exited);
        waiter.join().expect("waiter panicked");
    }

    #[test]
    #[should_panic(expected = "still active")]
    fn passing_while_teammate_active_panics() {
        let board = TurnBoard::new(pile(2), 1, 3);
        // Robot #1 is active and has not grabbed; a pass from #2 would make two.
        board.pass_turn(Seat::new(Team::Blue, 2));
    }

    #[test]
    fn one_robot_in_flight_per_team_under_contention() {
        let teams = 3;
        let robots = 6;
        let total = 150u64;
        let board = Arc::new(TurnBoard::new(pile(total), teams, robots));
        let in_flight: Arc<Vec<AtomicUsize>> =
            Arc::new((0..teams).map(|_| AtomicUsize::new(0)).collect());
        let violation = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(std::sync::Mutex::new(HashSet::new()));
        let seats = board.seats();
        let barrier = Arc::new(Barrier::new(seats.len()));

        let handles: Vec<_> = seats
            .into_iter()
            .map(|seat| {
                let board = Arc::clone(&board);
                let in_flight = Arc::clone(&in_flight);
                let violation = Arc::clone(&violation);
                let seen = Arc::clone(&seen);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    while let Some(package) = board.wait_for_turn(seat).and_then(|t| t.grab()) {
                        let slot = &in_flight[seat.team.index()];
                        if slot.fetch_add(1, Ordering::SeqCst) > 0 {
                            violation.store(true, Ordering::SeqCst);
                        }
                        assert!(seen.lock().expect("seen mutex poisoned").insert(package.id));
                        thread::yield_now();
                        slot.fetch_sub(1, Ordering::SeqCst);
                        board.pass_turn(seat);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("robot thread panicked");
        }
        assert!(!violation.load(Ordering::SeqCst));
        assert_eq!(seen.lock().expect("seen mutex poisoned").len(), total as usize);
        for team in &Team::ALL[..teams] {
            assert!(board.active_count(*team) <= 1);
        }
    }
}

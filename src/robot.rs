//! The robot actor: wait for the team's turn, grab, route through stations,
//! record the completion and hand the turn on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{HoldRange, SimConfig};
use crate::ledger::Ledger;
use crate::pile::PackagePile;
use crate::probe::ExclusivityProbe;
use crate::stations::StationPool;
use crate::turns::{Turn, TurnBoard};
use crate::types::{MAX_TEAMS, Package, PackageId, STATION_COUNT, Seat, StationKind};

/// Everything the robots share. Each piece carries its own lock.
pub struct Floor {
    pub board: TurnBoard,
    pub stations: StationPool,
    pub ledger: Ledger,
    pub station_probe: ExclusivityProbe,
    pub team_probe: ExclusivityProbe,
    transit: HoldRange,
    work: HoldRange,
    station_wait_us: AtomicU64,
}

impl Floor {
    pub fn new(packages: Vec<Package>, config: &SimConfig) -> Self {
        Self {
            board: TurnBoard::new(
                PackagePile::new(packages),
                config.teams,
                config.robots_per_team,
            ),
            stations: StationPool::new(),
            ledger: Ledger::new(),
            station_probe: ExclusivityProbe::new(STATION_COUNT),
            team_probe: ExclusivityProbe::new(MAX_TEAMS),
            transit: config.transit.clone(),
            work: config.work.clone(),
            station_wait_us: AtomicU64::new(0),
        }
    }

    /// Time robots spent blocked on busy stations, summed.
    pub fn station_wait(&self) -> Duration {
        Duration::from_micros(self.station_wait_us.load(Ordering::SeqCst))
    }
}

/// Where a robot is in its work cycle. `Grabbing` holds the grab-lock.
pub enum Phase<'a> {
    WaitingTurn,
    Grabbing(Turn<'a>),
    Routing(usize),
    Completing,
    Terminated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedPackage {
    pub id: PackageId,
    /// Stations actually visited, in visit order.
    pub visited: Vec<StationKind>,
    /// Whether fragile handling fired at the Jostle station.
    pub jostled: bool,
}

#[derive(Clone, Debug)]
pub struct RobotReport {
    pub seat: Seat,
    pub completed: Vec<CompletedPackage>,
}

pub struct Robot {
    seat: Seat,
    rng: StdRng,
    package: Option<Package>,
    visited: Vec<StationKind>,
    jostled: bool,
    completed: Vec<CompletedPackage>,
}

impl Robot {
    /// Hold durations are drawn from a per-robot generator derived from `seed`.
    pub fn new(seat: Seat, seed: u64) -> Self {
        let stream = ((seat.team.index() as u64) << 32) | seat.robot as u64;
        Self {
            seat,
            rng: StdRng::seed_from_u64(seed ^ stream),
            package: None,
            visited: Vec::new(),
            jostled: false,
            completed: Vec::new(),
        }
    }

    /// Work until the pile is empty.
    pub fn run(mut self, floor: &Floor) -> RobotReport {
        let mut phase = Phase::WaitingTurn;
        loop {
            phase = match phase {
                Phase::WaitingTurn => match floor.board.wait_for_turn(self.seat) {
                    Some(turn) => Phase::Grabbing(turn),
                    None => Phase::Terminated,
                },
                Phase::Grabbing(turn) => self.grab(turn, floor),
                Phase::Routing(step) => self.route(step, floor),
                Phase::Completing => self.complete(floor),
                Phase::Terminated => break,
            };
        }
        debug!("[EXIT] robot {} stops, pile is empty", self.seat);
        RobotReport {
            seat: self.seat,
            completed: self.completed,
        }
    }

    fn grab<'a>(&mut self, turn: Turn<'a>, floor: &Floor) -> Phase<'a> {
        assert!(
            self.package.is_none(),
            "robot {} grabbed while still carrying a package",
            self.seat
        );
        let Some(package) = turn.grab() else {
            return Phase::Terminated;
        };
        floor.team_probe.enter(self.seat.team.index());
        info!("[GRAB] robot {} grabbed package {}", self.seat, package.id);
        debug!(
            "[INST] package {} has {} instructions: {:?} fragile={}",
            package.id,
            package.instructions.len(),
            package.instructions,
            package.fragile
        );
        debug!("[STRT] robot {} starts on package {}", self.seat, package.id);
        self.visited.clear();
        self.jostled = false;
        self.package = Some(package);
        Phase::Routing(0)
    }

    fn route<'a>(&mut self, step: usize, floor: &Floor) -> Phase<'a> {
        let Some(package) = self.package.as_ref() else {
            panic!("robot {} routing without a package", self.seat);
        };
        let kind = package.instructions[step];
        debug!(
            "[MOVE] robot {} moving package {} to station {kind}",
            self.seat, package.id
        );

        let wait_start = Instant::now();
        let handle = floor.stations.acquire(kind, self.seat);
        floor
            .station_wait_us
            .fetch_add(wait_start.elapsed().as_micros() as u64, Ordering::SeqCst);
        floor.station_probe.enter(kind.index());

        thread::sleep(floor.transit.sample(&mut self.rng));

        debug!(
            "[WORK] robot {} working on package {} at station {kind}",
            self.seat, package.id
        );
        if package.needs_jostle_care(step) {
            info!(
                "[VLNT] package {} is fragile, robot {} shakes it with care",
                package.id, self.seat
            );
            self.jostled = true;
        }
        thread::sleep(floor.work.sample(&mut self.rng));
        debug!(
            "[DONE] robot {} finished package {} at station {kind}",
            self.seat, package.id
        );

        floor.station_probe.leave(kind.index());
        floor.stations.release(handle);
        self.visited.push(kind);

        if step + 1 < package.instructions.len() {
            Phase::Routing(step + 1)
        } else {
            Phase::Completing
        }
    }

    fn complete<'a>(&mut self, floor: &Floor) -> Phase<'a> {
        let Some(package) = self.package.take() else {
            panic!("robot {} completing without a package", self.seat);
        };
        floor.ledger.record_completion(self.seat.team);
        floor.team_probe.leave(self.seat.team.index());
        info!("[CMLT] robot {} finished package {}", self.seat, package.id);
        self.completed.push(CompletedPackage {
            id: package.id,
            visited: std::mem::take(&mut self.visited),
            jostled: self.jostled,
        });
        floor.board.pass_turn(self.seat);
        Phase::WaitingTurn
    }
}

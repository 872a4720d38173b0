//! Simulation, benchmark, and stress-test runners for the warehouse.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{HoldRange, SimConfig};
use crate::error::ConfigError;
use crate::generator;
use crate::ledger::LedgerSnapshot;
use crate::robot::{Floor, Robot, RobotReport};
use crate::types::{Package, PackageId, StationKind, Team};

// Benchmark defaults, kept small for quick CLI feedback.
const BENCH_TEAMS: usize = 4;
const BENCH_ROBOTS_PER_TEAM: usize = 10;
const BENCH_PACKAGES: usize = 80;
const BENCH_WORK_US: u64 = 500;
const BENCH_SEED: u64 = 1;

const CSV_HEADER: &str = "teams,robots_per_team,packages,completed,elapsed_ms,throughput_pkgs_per_s,avg_station_wait_us,cpu_user_s,cpu_sys_s,max_station_occupancy,station_violation,turn_violation,duplicate_packages,misrouted";

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Everything observed during one run, read after every robot has exited.
#[derive(Debug)]
pub struct SimOutcome {
    pub teams: usize,
    pub robots_per_team: usize,
    pub requested: usize,
    pub ledger: LedgerSnapshot,
    pub reports: Vec<RobotReport>,
    pub leftover: usize,
    pub elapsed: Duration,
    pub station_wait: Duration,
    pub max_station_occupancy: usize,
    pub station_violation: bool,
    pub turn_violation: bool,
    pub duplicate_packages: bool,
    /// Packages whose visited stations differ from their instructions.
    pub misrouted: usize,
    /// Packages whose fragile handling fired when it should not have, or vice versa.
    pub mishandled: usize,
}

impl SimOutcome {
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.ledger.total as f64 / secs
        } else {
            0.0
        }
    }

    pub fn avg_station_wait_us(&self) -> f64 {
        let visits: usize = self
            .reports
            .iter()
            .flat_map(|r| &r.completed)
            .map(|c| c.visited.len())
            .sum();
        if visits > 0 {
            self.station_wait.as_micros() as f64 / visits as f64
        } else {
            0.0
        }
    }

    fn csv_row(&self, cpu: Option<(f64, f64)>) -> String {
        let (cpu_user, cpu_sys) = match cpu {
            Some((user, sys)) => (format!("{user:.4}"), format!("{sys:.4}")),
            None => ("NA".to_string(), "NA".to_string()),
        };
        format!(
            "{},{},{},{},{:.2},{:.2},{:.2},{},{},{},{},{},{},{}",
            self.teams,
            self.robots_per_team,
            self.requested,
            self.ledger.total,
            self.elapsed.as_secs_f64() * 1000.0,
            self.throughput(),
            self.avg_station_wait_us(),
            cpu_user,
            cpu_sys,
            self.max_station_occupancy,
            self.station_violation,
            self.turn_violation,
            self.duplicate_packages,
            self.misrouted
        )
    }
}

/// Generate the pile from the configured seed and run it to completion.
pub fn run_simulation(config: &SimConfig) -> Result<SimOutcome, ConfigError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let count = generator::package_count(&mut rng, &config.packages);
    let packages = generator::generate_packages(&mut rng, count);
    info!("[PILE] seed={} packages={count}", config.seed);
    Ok(run_with_packages(config, packages))
}

/// Run one robot thread per ring member over `packages` and join them all.
pub fn run_with_packages(config: &SimConfig, packages: Vec<Package>) -> SimOutcome {
    let requested = packages.len();
    let expected: HashMap<PackageId, (Vec<StationKind>, bool)> = packages
        .iter()
        .map(|p| {
            let jostles = p.fragile && p.instructions.contains(&StationKind::Jostle);
            (p.id, (p.instructions.clone(), jostles))
        })
        .collect();

    info!(
        "[SIM] {} robots across {} teams, {requested} packages",
        config.robots_total(),
        config.teams
    );
    let floor = Arc::new(Floor::new(packages, config));
    let start = Instant::now();
    let handles: Vec<_> = floor
        .board
        .seats()
        .into_iter()
        .map(|seat| {
            let floor = Arc::clone(&floor);
            let seed = config.seed;
            thread::Builder::new()
                .name(format!("{}-{}", seat.team.name().to_lowercase(), seat.robot))
                .spawn(move || Robot::new(seat, seed).run(&floor))
                .expect("failed to spawn robot thread")
        })
        .collect();

    let reports: Vec<RobotReport> = handles
        .into_iter()
        .map(|handle| handle.join().expect("robot thread panicked"))
        .collect();
    let elapsed = start.elapsed();

    let mut seen = HashSet::new();
    let mut duplicate_packages = false;
    let mut misrouted = 0;
    let mut mishandled = 0;
    for done in reports.iter().flat_map(|r| &r.completed) {
        if !seen.insert(done.id) {
            duplicate_packages = true;
        }
        match expected.get(&done.id) {
            Some((instructions, jostles)) => {
                if *instructions != done.visited {
                    misrouted += 1;
                }
                if *jostles != done.jostled {
                    mishandled += 1;
                }
            }
            None => misrouted += 1,
        }
    }

    for report in &reports {
        debug!(
            "[REPORT] robot {} completed {} packages",
            report.seat,
            report.completed.len()
        );
    }
    // Exited robots may leave the flag set, but never two per team.
    let turn_violation = floor.team_probe.has_violation()
        || Team::ALL[..config.teams]
            .iter()
            .any(|&team| floor.board.active_count(team) > 1);

    let leftover = floor.board.remaining();
    if leftover > 0 {
        warn!("[PILE] {leftover} packages left behind");
    }
    let occupied = floor.stations.occupied_stations();
    if !occupied.is_empty() {
        warn!("[STATION] still occupied at end: {occupied:?}");
    }

    SimOutcome {
        teams: config.teams,
        robots_per_team: config.robots_per_team,
        requested,
        ledger: floor.ledger.snapshot(),
        reports,
        leftover,
        elapsed,
        station_wait: floor.station_wait(),
        max_station_occupancy: floor.station_probe.max_occupancy(),
        station_violation: floor.station_probe.has_violation(),
        turn_violation,
        duplicate_packages,
        misrouted,
        mishandled,
    }
}

/// Run the reference warehouse and print the final tally.
pub fn run_demo(config: &SimConfig) -> Result<(), ConfigError> {
    info!(
        "[DEMO] start seed={} teams={} robots_per_team={}",
        config.seed, config.teams, config.robots_per_team
    );
    let outcome = run_simulation(config)?;
    info!("[DEMO] finished in {}ms", outcome.elapsed.as_millis());

    println!("SIMULATION SUMMARY");
    println!("seed={}", config.seed);
    println!("packages_requested={}", outcome.requested);
    println!("packages_completed={}", outcome.ledger.total);
    println!("team_completed={}", outcome.ledger.team_summary(config.teams));
    println!("max_station_occupancy={}", outcome.max_station_occupancy);
    println!("station_violation={}", outcome.station_violation);
    println!("turn_violation={}", outcome.turn_violation);
    println!("duplicate_packages={}", outcome.duplicate_packages);
    println!("misrouted_packages={}", outcome.misrouted);
    Ok(())
}

fn bench_config(
    teams: usize,
    robots_per_team: usize,
    packages: usize,
    work_us: u64,
    seed: u64,
) -> SimConfig {
    let hold = if work_us == 0 {
        HoldRange::instant()
    } else {
        HoldRange::new(0, work_us)
    };
    SimConfig {
        seed,
        teams,
        robots_per_team,
        packages: packages..=packages,
        transit: hold.clone(),
        work: hold,
    }
}

fn report_anomalies(outcome: &SimOutcome) {
    if outcome.leftover > 0 {
        eprintln!("# warning,leftover_packages,{}", outcome.leftover);
    }
    if outcome.station_violation {
        eprintln!("# violation,station_exclusivity");
    }
    if outcome.turn_violation {
        eprintln!("# violation,turn_exclusivity");
    }
    if outcome.duplicate_packages {
        eprintln!("# violation,duplicate_packages");
    }
    if outcome.misrouted > 0 {
        eprintln!("# violation,misrouted,{}", outcome.misrouted);
    }
    if outcome.mishandled > 0 {
        eprintln!("# violation,fragile_handling,{}", outcome.mishandled);
    }
}

fn bench_once(config: &SimConfig) -> Result<String, ConfigError> {
    let cpu_start = cpu_times_seconds();
    let outcome = run_simulation(config)?;
    let cpu = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            Some((user_end - user_start, sys_end - sys_start))
        }
        _ => None,
    };
    report_anomalies(&outcome);
    Ok(outcome.csv_row(cpu))
}

/// Run a single benchmark with optional parameter overrides.
pub fn run_benchmark(
    teams: Option<usize>,
    robots_per_team: Option<usize>,
    packages: Option<usize>,
    work_us: Option<u64>,
    seed: Option<u64>,
) -> Result<(), ConfigError> {
    let config = bench_config(
        teams.unwrap_or(BENCH_TEAMS),
        robots_per_team.unwrap_or(BENCH_ROBOTS_PER_TEAM),
        packages.unwrap_or(BENCH_PACKAGES),
        work_us.unwrap_or(BENCH_WORK_US),
        seed.unwrap_or(BENCH_SEED),
    );
    let row = bench_once(&config)?;
    println!("{CSV_HEADER}");
    println!("{row}");
    Ok(())
}

/// Sweep multiple benchmark configurations and print CSV output.
pub fn run_stress(
    team_sets: Option<Vec<usize>>,
    robot_sets: Option<Vec<usize>>,
    package_sets: Option<Vec<usize>>,
    work_us: Option<u64>,
) -> Result<(), ConfigError> {
    let team_sets = team_sets.unwrap_or_else(|| vec![1, 2, 4]);
    let robot_sets = robot_sets.unwrap_or_else(|| vec![1, 2, 10]);
    let package_sets = package_sets.unwrap_or_else(|| vec![0, 20, 80]);
    let work_us = work_us.unwrap_or(BENCH_WORK_US);

    // Reject the whole sweep up front rather than failing halfway through.
    for &teams in &team_sets {
        for &robots in &robot_sets {
            bench_config(teams, robots, 0, work_us, BENCH_SEED).validate()?;
        }
    }

    println!("{CSV_HEADER}");
    for &teams in &team_sets {
        for &robots in &robot_sets {
            for &packages in &package_sets {
                let config = bench_config(teams, robots, packages, work_us, BENCH_SEED);
                println!("{}", bench_once(&config)?);
            }
        }
    }
    Ok(())
}

//! Shared identifiers and the package model used across the warehouse.

use std::fmt;

/// Unique, 1-based sequence number of a package.
pub type PackageId = u64;
/// 1-based position of a robot inside its team ring.
pub type RobotId = usize;

/// Number of stations on the floor; fixed for the whole run.
pub const STATION_COUNT: usize = 4;
/// Upper bound on the number of teams (one name per team).
pub const MAX_TEAMS: usize = 4;

/// The four teams a robot can belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {
    Blue,
    Red,
    Green,
    Yellow,
}

impl Team {
    pub const ALL: [Team; MAX_TEAMS] = [Team::Blue, Team::Red, Team::Green, Team::Yellow];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Team::Blue => "Blue",
            Team::Red => "Red",
            Team::Green => "Green",
            Team::Yellow => "Yellow",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Processing step a package may require; each kind has exactly one station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StationKind {
    Weigh,
    Barcode,
    XRay,
    Jostle,
}

impl StationKind {
    pub const ALL: [StationKind; STATION_COUNT] = [
        StationKind::Weigh,
        StationKind::Barcode,
        StationKind::XRay,
        StationKind::Jostle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StationKind::Weigh => "Weigh",
            StationKind::Barcode => "Barcode",
            StationKind::XRay => "X-ray",
            StationKind::Jostle => "Jostle",
        }
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A robot's place in the warehouse: its team and its position in the ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Seat {
    pub team: Team,
    pub robot: RobotId,
}

impl Seat {
    pub fn new(team: Team, robot: RobotId) -> Self {
        Self { team, robot }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.team, self.robot)
    }
}

/// Unit of work pulled from the pile and routed through its stations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    /// Stable sequence number; insertion order in the pile.
    pub id: PackageId,
    /// Stations to visit, in order, without repeats (1 to 4 entries).
    pub instructions: Vec<StationKind>,
    /// Fragile packages get extra handling at the Jostle station.
    pub fragile: bool,
}

impl Package {
    /// Construct a package; instruction lists must be non-empty and repeat-free.
    pub fn new(id: PackageId, instructions: Vec<StationKind>, fragile: bool) -> Self {
        debug_assert!(
            !instructions.is_empty() && instructions.len() <= STATION_COUNT,
            "package {id} has {} instructions",
            instructions.len()
        );
        debug_assert!(
            instructions
                .iter()
                .enumerate()
                .all(|(i, kind)| !instructions[..i].contains(kind)),
            "package {id} repeats a station"
        );
        Self {
            id,
            instructions,
            fragile,
        }
    }

    /// Whether the instruction at `step` triggers the fragile-jostle handling.
    pub fn needs_jostle_care(&self, step: usize) -> bool {
        self.fragile && self.instructions.get(step) == Some(&StationKind::Jostle)
    }
}

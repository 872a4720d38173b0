//! Completed-package counters, total and per team.

use std::sync::Mutex;

use crate::types::{MAX_TEAMS, Team};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub total: usize,
    pub per_team: [usize; MAX_TEAMS],
}

impl LedgerSnapshot {
    pub fn team(&self, team: Team) -> usize {
        self.per_team[team.index()]
    }

    /// `Blue:3,Red:4,...` for the first `teams` teams.
    pub fn team_summary(&self, teams: usize) -> String {
        Team::ALL[..teams]
            .iter()
            .map(|team| format!("{team}:{}", self.team(*team)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub struct Ledger {
    counts: Mutex<LedgerSnapshot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(LedgerSnapshot::default()),
        }
    }

    /// Count one finished package for `team`.
    pub fn record_completion(&self, team: Team) {
        let mut guard = self.counts.lock().expect("ledger mutex poisoned");
        guard.total += 1;
        guard.per_team[team.index()] += 1;
        debug_assert_eq!(guard.total, guard.per_team.iter().sum::<usize>());
    }

    /// Copy of the counters. Only meaningful once every robot has finished.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let guard = self.counts.lock().expect("ledger mutex poisoned");
        let snapshot = guard.clone();
        assert_eq!(
            snapshot.total,
            snapshot.per_team.iter().sum::<usize>(),
            "ledger total diverged from team counts"
        );
        snapshot
    }
}

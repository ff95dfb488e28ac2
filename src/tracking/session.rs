//! Session tokens and tick cadence bookkeeping

use std::fmt;
use std::time::Duration;

/// Identifies one tracking session.
///
/// Never zero; zero is reserved for "no active session". Each `start`
/// receives a token distinct from every earlier one in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Wrap a raw token value; `None` for zero
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tick granularity and the sample/sync cadences expressed in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between scheduler ticks
    pub tick: Duration,
    /// Sample every N ticks
    pub position_interval_ticks: u32,
    /// Sync every N ticks
    pub sync_interval_ticks: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(60),
            position_interval_ticks: 1,
            sync_interval_ticks: 10,
        }
    }
}

/// Which components are due on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Due {
    pub sample: bool,
    pub sync: bool,
}

/// Ticks remaining until the next sample and the next sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdowns {
    sample_in: u32,
    sync_in: u32,
}

impl Countdowns {
    /// Fresh countdowns; the first sample/sync fall one full interval out
    pub fn new(schedule: &Schedule) -> Self {
        Self {
            sample_in: schedule.position_interval_ticks.max(1),
            sync_in: schedule.sync_interval_ticks.max(1),
        }
    }

    /// Consume one tick, resetting any countdown that reached zero
    pub fn advance(&mut self, schedule: &Schedule) -> Due {
        let mut due = Due::default();

        self.sample_in = self.sample_in.saturating_sub(1);
        if self.sample_in == 0 {
            due.sample = true;
            self.sample_in = schedule.position_interval_ticks.max(1);
        }

        self.sync_in = self.sync_in.saturating_sub(1);
        if self.sync_in == 0 {
            due.sync = true;
            self.sync_in = schedule.sync_interval_ticks.max(1);
        }

        due
    }
}

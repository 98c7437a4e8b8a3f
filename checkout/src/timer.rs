//! Reservation countdown for the contact-entry step.
//!
//! The timer only runs while the user is on [`Step::ContactEntry`]; it pauses
//! on any other step. The runtime drives it with cancellable delayed
//! `TimerTicked` actions, one per tick interval.

use crate::types::Step;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a tick did to the timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing changed
    Idle,
    /// Still counting down
    Counting(Duration),
    /// Reached zero on this tick
    Expired,
}

/// Countdown of how long the selected tickets stay reserved
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationTimer {
    duration: Duration,
    remaining: Duration,
    running: bool,
}

impl ReservationTimer {
    /// Timer armed with `duration`, not yet running
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self {
            duration,
            remaining: duration,
            running: false,
        }
    }

    /// Starting duration
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whether the countdown is running
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Run the timer if `step` is the contact step, pause it otherwise.
    ///
    /// Returns `true` when the timer went from paused to running, meaning a
    /// tick needs to be scheduled.
    pub fn start(&mut self, step: Step) -> bool {
        if step != Step::ContactEntry || self.remaining.is_zero() {
            self.running = false;
            return false;
        }
        let started = !self.running;
        self.running = true;
        started
    }

    /// Stop counting, keeping the time left
    pub const fn pause(&mut self) {
        self.running = false;
    }

    /// Re-arm from the starting duration. Running state is unchanged.
    pub const fn reset(&mut self) {
        self.remaining = self.duration;
    }

    /// Count down by `elapsed`
    pub fn tick(&mut self, elapsed: Duration) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.running = false;
            TickOutcome::Expired
        } else {
            TickOutcome::Counting(self.remaining)
        }
    }

    /// Time left as `MM:SS`
    #[must_use]
    pub fn formatted(&self) -> String {
        format_time(self.remaining)
    }
}

/// Format a duration as `MM:SS`, rounding partial seconds up.
///
/// Minutes are not wrapped into hours.
#[must_use]
pub fn format_time(remaining: Duration) -> String {
    let mut secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs += 1;
    }
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Result of advancing the clock by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// Clock is stopped or already expired
    Idle,
    Running(u32),
    /// Reached zero on this tick
    Expired,
}

/// Countdown for a session, in whole ticks
#[derive(Debug)]
pub struct SessionClock {
    remaining: u32,
    running: bool,
    expired: bool,
}

impl SessionClock {
    pub fn new(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            running: false,
            expired: false,
        }
    }

    pub fn start(&mut self) {
        if !self.expired {
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self) -> ClockTick {
        if !self.running || self.expired {
            return ClockTick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            self.running = false;
            return ClockTick::Expired;
        }
        ClockTick::Running(self.remaining)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_expired(&self) -> bool {
        self.expired
    }
}

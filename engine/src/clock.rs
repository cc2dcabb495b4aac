use std::time::Duration;

/// Game time that only accrues while running. Bot move gates, teleport
/// cooldowns and wall shifts all read from it, so a pause freezes them.
#[derive(Clone, Debug, Default)]
pub struct GameClock {
    elapsed: Duration,
    running: bool,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.elapsed = Duration::ZERO;
        self.running = true;
    }

    /// Picks up a saved match: the clock holds `elapsed` and stays paused.
    pub fn restore(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        self.running = false;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Adds real time to the clock; ignored while paused.
    pub fn advance(&mut self, delta: Duration) {
        if self.running {
            self.elapsed += delta;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn now_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

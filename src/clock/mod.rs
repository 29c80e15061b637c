//! Wall-clock source shared by the decision engine and the stores.
//!
//! Time is read as `SystemTime` (HTTP dates and stored timestamps are wall
//! clock values) but advances with [`tokio::time::Instant`]. Under a paused
//! Tokio runtime, `tokio::time::advance` therefore moves every freshness,
//! bypass and expiry computation forward together.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// A monotonic-backed wall clock.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    wall: SystemTime,
    mono: Instant,
}

impl Clock {
    /// Anchors a new clock at the current wall-clock time.
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Anchors a clock at an arbitrary wall-clock time.
    pub fn starting_at(wall: SystemTime) -> Self {
        Self {
            wall,
            mono: Instant::now(),
        }
    }

    /// Current wall-clock time.
    pub fn now(&self) -> SystemTime {
        self.wall + self.mono.elapsed()
    }

    /// Current time in milliseconds since the Unix epoch.
    pub fn now_ms(&self) -> u64 {
        to_millis(self.now())
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Milliseconds since the Unix epoch, saturating at zero for earlier times.
pub fn to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Inverse of [`to_millis`].
pub fn from_millis(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn follows_paused_time() {
        let clock = Clock::starting_at(from_millis(1_000));
        assert_eq!(clock.now_ms(), 1_000);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(clock.now_ms(), 62_000);
    }
}

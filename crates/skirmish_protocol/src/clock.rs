use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Longest stretch of time a single tick may integrate.
pub const MAX_TICK_SECONDS: f64 = 0.1;
pub const POSITION_REPORT_INTERVAL: Duration = Duration::from_millis(50);

/// Turns raw frame deltas into integration steps.
///
/// Non-finite or non-positive deltas yield no step. Stalls (tab suspension,
/// debugger pauses) are capped at [`MAX_TICK_SECONDS`] so one frame cannot
/// teleport the player or pile up velocity.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    simulated: f64,
    ticks: u64,
    clamped: u64,
}

impl FrameClock {
    pub fn advance(&mut self, raw_seconds: f64) -> Option<f32> {
        if !raw_seconds.is_finite() || raw_seconds <= 0.0 {
            return None;
        }
        if raw_seconds > MAX_TICK_SECONDS {
            self.clamped += 1;
            tracing::debug!(raw_seconds, "frame delta clamped");
        }
        let step = raw_seconds.min(MAX_TICK_SECONDS);
        self.simulated += step;
        self.ticks += 1;
        Some(step as f32)
    }

    /// Total simulated seconds since the session started.
    pub fn simulated(&self) -> f64 {
        self.simulated
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn clamped_ticks(&self) -> u64 {
        self.clamped
    }
}

/// Wall-clock rate limiter for outbound reports.
#[derive(Debug, Clone)]
pub struct ReportThrottle {
    interval: Duration,
    last: Option<Duration>,
}

impl ReportThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true and arms the throttle if a report may go out at `now`.
    pub fn ready(&mut self, now: Duration) -> bool {
        match self.last {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for ReportThrottle {
    fn default() -> Self {
        Self::new(POSITION_REPORT_INTERVAL)
    }
}

/// Milliseconds since the UNIX epoch, the unit authority timestamps use.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_deltas_produce_no_step() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(f64::NAN), None);
        assert_eq!(clock.advance(-0.5), None);
        assert_eq!(clock.advance(0.0), None);
        assert_eq!(clock.advance(f64::INFINITY), None);
        assert_eq!(clock.ticks(), 0);
    }

    #[test]
    fn stalls_are_clamped() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(12.0), Some(MAX_TICK_SECONDS as f32));
        assert_eq!(clock.clamped_ticks(), 1);
        assert!((clock.simulated() - MAX_TICK_SECONDS).abs() < 1e-12);
    }

    #[test]
    fn throttle_allows_one_report_per_interval() {
        let mut throttle = ReportThrottle::default();
        assert!(throttle.ready(Duration::from_millis(1000)));
        assert!(!throttle.ready(Duration::from_millis(1020)));
        assert!(!throttle.ready(Duration::from_millis(1049)));
        assert!(throttle.ready(Duration::from_millis(1050)));
        assert!(!throttle.ready(Duration::from_millis(1051)));
    }
}

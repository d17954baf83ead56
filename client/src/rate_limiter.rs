//! Time-window throttle for fire-class actions

use std::time::{Duration, Instant};

/// Lets one action through per window and drops the rest.
///
/// The first call after a window has elapsed fires immediately and opens a new
/// window of length `interval`. Calls inside an open window are discarded, never
/// deferred.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    window_start: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true and opens a window if `now` is outside the current one.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        let open = match self.window_start {
            Some(start) => now.saturating_duration_since(start) < self.interval,
            None => false,
        };
        if open {
            return false;
        }
        self.window_start = Some(now);
        true
    }

    /// Runs `action` if the window allows it.
    pub fn throttle<T>(&mut self, now: Instant, action: impl FnOnce() -> T) -> Option<T> {
        if self.try_acquire(now) {
            Some(action())
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.window_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_window_drops_calls_inside_interval() {
        let mut limiter = RateLimiter::new(ms(200));
        let t = Instant::now();
        let mut fired = Vec::new();

        for offset in [0, 10, 50, 210] {
            limiter.throttle(t + ms(offset), || fired.push(offset));
        }

        assert_eq!(fired, vec![0, 210]);
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let mut limiter = RateLimiter::new(ms(200));
        let t = Instant::now();
        assert!(limiter.try_acquire(t));
        assert!(!limiter.try_acquire(t + ms(199)));
        assert!(limiter.try_acquire(t + ms(200)));
    }

    #[test]
    fn test_held_trigger_fires_five_per_second() {
        let mut limiter = RateLimiter::new(ms(200));
        let t = Instant::now();
        let fired = (0..60)
            .filter(|frame| limiter.try_acquire(t + ms(frame * 1000 / 60)))
            .count();
        assert_eq!(fired, 5);
    }

    #[test]
    fn test_reset_opens_immediately() {
        let mut limiter = RateLimiter::new(ms(200));
        let t = Instant::now();
        assert!(limiter.try_acquire(t));
        limiter.reset();
        assert!(limiter.try_acquire(t + ms(1)));
        assert_eq!(limiter.interval(), ms(200));
    }
}

//! Fixed-window rate limiter.
//!
//! # Design Decisions
//! - Fixed window, not sliding: the counter resets fully once the window has
//!   elapsed, so up to 2×capacity admissions can land around a boundary
//! - One mutex guards the whole window state; check-and-increment is atomic
//! - Rejection has no side effect

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

struct Window {
    start: Instant,
    count: u32,
}

/// Admission gate bounding call throughput.
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            state: Mutex::new(Window {
                start: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Admit one call if the current window has room.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Same as [`try_acquire`](Self::try_acquire) with an explicit clock reading.
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if now.saturating_duration_since(state.start) > self.window {
            state.start = now;
            state.count = 0;
        }
        if state.count < self.capacity {
            state.count += 1;
            true
        } else {
            false
        }
    }

    /// Admissions left in the current window (as of the last reset).
    pub fn remaining(&self) -> u32 {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.start.elapsed() > self.window {
            self.capacity
        } else {
            self.capacity.saturating_sub(state.count)
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_capacity_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.try_acquire_at(now));
        assert!(limiter.try_acquire_at(now));
        assert!(limiter.try_acquire_at(now));
        assert!(!limiter.try_acquire_at(now));
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));
        let start = Instant::now() + Duration::from_millis(200);

        assert!(limiter.try_acquire_at(start));
        assert!(!limiter.try_acquire_at(start + Duration::from_millis(100)));
        assert!(limiter.try_acquire_at(start + Duration::from_millis(101)));
    }

    #[test]
    fn test_burst_across_boundary() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        let start = Instant::now() + Duration::from_millis(200);

        // Opens a fresh window at `start`, then fills it at its very end...
        assert!(limiter.try_acquire_at(start));
        assert!(limiter.try_acquire_at(start + Duration::from_millis(99)));
        assert!(!limiter.try_acquire_at(start + Duration::from_millis(99)));
        // ...and the next window admits a full batch right away.
        let later = start + Duration::from_millis(101);
        assert!(limiter.try_acquire_at(later));
        assert!(limiter.try_acquire_at(later));
        assert!(!limiter.try_acquire_at(later));
    }

    #[test]
    fn test_concurrent_admissions_never_exceed_capacity() {
        let limiter = Arc::new(RateLimiter::new(50, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..20).filter(|_| limiter.try_acquire()).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }
}

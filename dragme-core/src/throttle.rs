// ABOUTME: Per-key cooldown gate for side-effecting commands
// ABOUTME: Reserves a key's slot up front and can hand it back if the command fails

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Returned when a key is still cooling down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub remaining: Duration,
}

/// A slot taken by `try_acquire`. Pass it to `release` to undo the stamp.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    acquired_at: Instant,
    prior: Option<Instant>,
}

/// Minimum-interval limiter keyed by user (or any other scope key).
///
/// `try_acquire` checks and stamps under one lock, so concurrent callers
/// for the same key cannot both get through.
pub struct RequestThrottle {
    window: Duration,
    last_use: Mutex<HashMap<String, Instant>>,
}

impl RequestThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_use: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check and, on success, stamp `now` as the last use of `key`
    pub fn try_acquire(&self, key: &str, now: Instant) -> Result<Reservation, Wait> {
        let mut last_use = self.last_use.lock().unwrap_or_else(|e| e.into_inner());
        let prior = last_use.get(key).copied();
        if let Some(last) = prior {
            self.remaining(last, now)?;
        }
        last_use.insert(key.to_string(), now);
        Ok(Reservation {
            acquired_at: now,
            prior,
        })
    }

    /// Give a reservation back, restoring the stamp it replaced.
    ///
    /// A no-op if another acquire has stamped the key since.
    pub fn release(&self, key: &str, reservation: Reservation) {
        let mut last_use = self.last_use.lock().unwrap_or_else(|e| e.into_inner());
        if last_use.get(key) != Some(&reservation.acquired_at) {
            return;
        }
        match reservation.prior {
            Some(prior) => {
                last_use.insert(key.to_string(), prior);
            }
            None => {
                last_use.remove(key);
            }
        }
    }

    fn remaining(&self, last: Instant, now: Instant) -> Result<(), Wait> {
        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.window {
            Ok(())
        } else {
            Err(Wait {
                remaining: self.window - elapsed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_first_acquire_succeeds() {
        let throttle = RequestThrottle::new(WINDOW);
        assert!(throttle.try_acquire("u1", Instant::now()).is_ok());
    }

    #[test]
    fn test_immediate_retry_waits_full_window() {
        let throttle = RequestThrottle::new(WINDOW);
        let t = Instant::now();
        throttle.try_acquire("u1", t).unwrap();
        let wait = throttle.try_acquire("u1", t).unwrap_err();
        assert_eq!(wait.remaining, WINDOW);
    }

    #[test]
    fn test_acquire_after_window_succeeds() {
        let throttle = RequestThrottle::new(WINDOW);
        let t = Instant::now();
        throttle.try_acquire("u1", t).unwrap();

        let wait = throttle
            .try_acquire("u1", t + Duration::from_secs(45))
            .unwrap_err();
        assert_eq!(wait.remaining, Duration::from_secs(15));

        assert!(throttle.try_acquire("u1", t + WINDOW).is_ok());
    }

    #[test]
    fn test_failed_acquire_does_not_extend_window() {
        let throttle = RequestThrottle::new(WINDOW);
        let t = Instant::now();
        throttle.try_acquire("u1", t).unwrap();
        let _ = throttle.try_acquire("u1", t + Duration::from_secs(59));
        assert!(throttle.try_acquire("u1", t + WINDOW).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let throttle = RequestThrottle::new(WINDOW);
        let t = Instant::now();
        throttle.try_acquire("u1", t).unwrap();
        assert!(throttle.try_acquire("u2", t).is_ok());
    }

    #[test]
    fn test_release_frees_a_fresh_key() {
        let throttle = RequestThrottle::new(WINDOW);
        let t = Instant::now();
        let reservation = throttle.try_acquire("u1", t).unwrap();
        throttle.release("u1", reservation);
        assert!(throttle.try_acquire("u1", t).is_ok());
    }

    #[test]
    fn test_release_restores_previous_stamp() {
        let throttle = RequestThrottle::new(WINDOW);
        let t = Instant::now();
        throttle.try_acquire("u1", t).unwrap();

        let later = t + Duration::from_secs(70);
        let reservation = throttle.try_acquire("u1", later).unwrap();
        throttle.release("u1", reservation);

        // Still measured from the first use, so the window has already passed
        assert!(throttle.try_acquire("u1", later).is_ok());
    }

    #[test]
    fn test_stale_release_keeps_newer_stamp() {
        let throttle = RequestThrottle::new(WINDOW);
        let t = Instant::now();
        let first = throttle.try_acquire("u1", t).unwrap();
        let second = t + WINDOW;
        throttle.try_acquire("u1", second).unwrap();

        throttle.release("u1", first);

        let wait = throttle
            .try_acquire("u1", second + Duration::from_secs(10))
            .unwrap_err();
        assert_eq!(wait.remaining, Duration::from_secs(50));
    }
}

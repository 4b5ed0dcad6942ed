//! In-memory submit throttle, keyed by client address. Per-process only;
//! a multi-instance deployment needs a shared store instead.

use std::time::{Duration, Instant};

use dashmap::DashMap;

const WINDOW: Duration = Duration::from_secs(15 * 60);
const MAX_PER_WINDOW: u32 = 5;

struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

pub struct RateLimiter {
    window: Duration,
    max_per_window: u32,
    windows: DashMap<String, WindowEntry>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            window: WINDOW,
            max_per_window: MAX_PER_WINDOW,
            windows: DashMap::new(),
        }
    }

    /// Count one attempt against `key`. Expired windows restart; an attempt
    /// over the cap is rejected with the seconds until the window resets.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();
        self.windows.retain(|_, v| v.reset_at >= now);

        let mut entry = self.windows.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            reset_at: now + self.window,
        });
        if entry.reset_at < now {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }
        entry.count += 1;
        if entry.count > self.max_per_window {
            let remaining = entry.reset_at.saturating_duration_since(now);
            let mut secs = remaining.as_secs();
            if remaining.subsec_nanos() > 0 {
                secs += 1;
            }
            RateDecision::Limited {
                retry_after_secs: secs,
            }
        } else {
            RateDecision::Allowed
        }
    }
}

/// User-facing 429 body, rounded up to whole minutes.
pub fn limit_message(retry_after_secs: u64) -> String {
    let minutes = retry_after_secs.div_ceil(60);
    format!("Too many requests. Please try again in {minutes} minute(s).")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window: Duration, max_per_window: u32) -> RateLimiter {
        RateLimiter {
            window,
            max_per_window,
            windows: DashMap::new(),
        }
    }

    #[test]
    fn allows_up_to_cap_then_rejects() {
        let rl = RateLimiter::new();
        for _ in 0..5 {
            assert_eq!(rl.check("1.2.3.4"), RateDecision::Allowed);
        }
        match rl.check("1.2.3.4") {
            RateDecision::Limited { retry_after_secs } => {
                assert!(retry_after_secs > 0 && retry_after_secs <= 15 * 60);
            }
            RateDecision::Allowed => panic!("sixth attempt should be limited"),
        }
        // Still limited afterwards.
        assert!(matches!(rl.check("1.2.3.4"), RateDecision::Limited { .. }));
    }

    #[test]
    fn keys_are_independent() {
        let rl = limiter(Duration::from_secs(60), 1);
        assert_eq!(rl.check("a"), RateDecision::Allowed);
        assert_eq!(rl.check("b"), RateDecision::Allowed);
        assert!(matches!(rl.check("a"), RateDecision::Limited { .. }));
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let rl = limiter(Duration::from_millis(40), 2);
        assert_eq!(rl.check("k"), RateDecision::Allowed);
        assert_eq!(rl.check("k"), RateDecision::Allowed);
        assert!(matches!(rl.check("k"), RateDecision::Limited { .. }));

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(rl.check("k"), RateDecision::Allowed);
    }

    #[test]
    fn expired_windows_are_pruned_on_access() {
        let rl = limiter(Duration::from_millis(20), 5);
        rl.check("gone-soon");
        std::thread::sleep(Duration::from_millis(40));
        rl.check("other");
        assert_eq!(rl.windows.len(), 1);
    }

    #[test]
    fn message_rounds_up_to_minutes() {
        assert_eq!(limit_message(1), "Too many requests. Please try again in 1 minute(s).");
        assert_eq!(limit_message(60), "Too many requests. Please try again in 1 minute(s).");
        assert_eq!(limit_message(61), "Too many requests. Please try again in 2 minute(s).");
        assert_eq!(limit_message(900), "Too many requests. Please try again in 15 minute(s).");
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Advisory request limiter. Process-local and best-effort: its state
/// resets on restart and is not shared across instances, so its only
/// failure mode is admitting slightly too many requests.
pub trait RateLimiter: Send + Sync {
    fn admit(&self, key: &str, now: DateTime<Utc>) -> bool;
}

/// Once the map reaches this many keys, elapsed windows are swept on the
/// next `admit`. Keys come from spoofable request headers, so the map must
/// not grow without bound.
const EVICT_THRESHOLD: usize = 1000;

/// Fixed-window counter keyed by client address. Taking `now` as an
/// argument keeps the window logic free of timing dependencies in tests.
pub struct MemoryRateLimiter {
    max_per_window: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (DateTime<Utc>, u32)>>,
}

impl MemoryRateLimiter {
    pub fn new(max_per_window: u32) -> MemoryRateLimiter {
        MemoryRateLimiter {
            max_per_window,
            window: Duration::seconds(60),
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn admit(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut windows = self.windows.lock().unwrap();

        if windows.len() >= EVICT_THRESHOLD {
            windows.retain(|_, (started, _)| now - *started < self.window);
        }

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if now - entry.0 >= self.window {
            *entry = (now, 0);
        }

        if entry.1 >= self.max_per_window {
            return false;
        }

        entry.1 += 1;
        true
    }
}

// ABOUTME: Rate limiting for repeated failure log lines.
// ABOUTME: Allows one event per class per window and counts what was suppressed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Default window between logged failures of the same class.
pub const DEFAULT_LOG_WINDOW: Duration = Duration::from_secs(300);

struct Slot {
    last_logged: Instant,
    suppressed: u64,
}

/// Decides whether a failure of a given class should be logged now.
pub struct LogThrottle<K> {
    window: Duration,
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K: Eq + Hash> LogThrottle<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `Some(suppressed)` when the event should be logged, where
    /// `suppressed` counts events dropped since the last logged one.
    pub fn admit(&self, class: K) -> Option<u64> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        match slots.get_mut(&class) {
            Some(slot) if now.duration_since(slot.last_logged) < self.window => {
                slot.suppressed += 1;
                None
            }
            Some(slot) => {
                let suppressed = slot.suppressed;
                slot.last_logged = now;
                slot.suppressed = 0;
                Some(suppressed)
            }
            None => {
                slots.insert(
                    class,
                    Slot {
                        last_logged: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }
}

impl<K: Eq + Hash> Default for LogThrottle<K> {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_WINDOW)
    }
}

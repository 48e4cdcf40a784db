//! Idempotency state, spec §4.5.1: `closingInFlight` (lock) and
//! `recentlyClosed` (TTL). Keyed by `venue:normalizedSymbol`
//! ([`fra_schemas::position::Position::key`]).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct PositionLocks {
    closing_in_flight: Mutex<HashSet<String>>,
    recently_closed: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl Default for PositionLocks {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl PositionLocks {
    pub fn new(ttl: Duration) -> Self {
        Self {
            closing_in_flight: Mutex::new(HashSet::new()),
            recently_closed: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn is_closing_in_flight(&self, key: &str) -> bool {
        self.closing_in_flight.lock().unwrap().contains(key)
    }

    /// Returns `true` and locks `key`, or `false` if it was already locked.
    pub fn try_acquire_close_lock(&self, key: &str) -> bool {
        self.closing_in_flight.lock().unwrap().insert(key.to_string())
    }

    /// Releases the lock without marking the key as recently closed
    /// (failure path).
    pub fn release_lock(&self, key: &str) {
        self.closing_in_flight.lock().unwrap().remove(key);
    }

    /// Releases the lock and stamps `recentlyClosed[key] = now`.
    pub fn mark_closed(&self, key: &str) {
        self.closing_in_flight.lock().unwrap().remove(key);
        self.recently_closed.lock().unwrap().insert(key.to_string(), Instant::now());
    }

    /// Honors the TTL; expired entries are pruned lazily on read.
    pub fn is_recently_closed(&self, key: &str) -> bool {
        let mut map = self.recently_closed.lock().unwrap();
        match map.get(key) {
            Some(stamp) if stamp.elapsed() < self.ttl => true,
            Some(_) => {
                map.remove(key);
                false
            }
            None => false,
        }
    }
}

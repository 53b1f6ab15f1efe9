use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::data::ItemKey;

/// Last poll attempt per `(operation_id, chain)`.
///
/// Shared between intake, which stamps a key on submission, and the poll
/// worker, which stamps it after each failed lookup. Clones share the map.
#[derive(Debug, Clone, Default)]
pub struct RateGate {
    attempts: Arc<DashMap<ItemKey, Instant>>,
}

impl RateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `at` as the latest attempt for `key`, returning the stamp it replaced.
    pub fn stamp(&self, key: ItemKey, at: Instant) -> Option<Instant> {
        self.attempts.insert(key, at)
    }

    pub fn last_attempt(&self, key: &ItemKey) -> Option<Instant> {
        self.attempts.get(key).map(|entry| *entry.value())
    }

    /// Earliest instant the key may be polled again, `None` if never stamped.
    pub fn ready_at(&self, key: &ItemKey, min_interval: Duration) -> Option<Instant> {
        self.last_attempt(key).map(|at| at + min_interval)
    }

    pub fn remove(&self, key: &ItemKey) {
        self.attempts.remove(key);
    }

    /// Drops entries whose last attempt is more than `max_age` before `now`.
    /// Returns how many were removed.
    pub fn prune(&self, now: Instant, max_age: Duration) -> usize {
        let before = self.attempts.len();
        self.attempts
            .retain(|_, last| now.saturating_duration_since(*last) <= max_age);
        before.saturating_sub(self.attempts.len())
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

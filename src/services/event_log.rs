//! Append-only zone event log with bounded retention
//!
//! Events are kept in append order in a ring buffer. Queries walk the buffer
//! from the newest end, so results are newest first. When `max_retained` is
//! reached, the oldest events are evicted.

use crate::domain::types::ZoneEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Default number of events returned when a query gives no limit
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Default ring buffer capacity
pub const DEFAULT_MAX_RETAINED: usize = 100_000;

pub struct EventLog {
    events: Mutex<VecDeque<ZoneEvent>>,
    /// Capacity of the ring buffer (None = unbounded)
    max_retained: Option<usize>,
    default_limit: usize,
    /// Events dropped to respect `max_retained` (monotonic)
    evicted_total: AtomicU64,
}

impl EventLog {
    /// Create a log. `max_retained == 0` disables eviction.
    pub fn new(max_retained: usize, default_limit: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            max_retained: (max_retained > 0).then_some(max_retained),
            default_limit,
            evicted_total: AtomicU64::new(0),
        }
    }

    /// Append events in the given order.
    ///
    /// The whole batch is appended under one lock, so the exit/enter pair of a
    /// zone change is never split by another writer.
    pub fn append<I>(&self, batch: I)
    where
        I: IntoIterator<Item = ZoneEvent>,
    {
        let mut events = self.events.lock();
        let mut evicted = 0u64;

        for event in batch {
            if let Some(max) = self.max_retained {
                if events.len() >= max {
                    events.pop_front();
                    evicted += 1;
                }
            }
            events.push_back(event);
        }

        if evicted > 0 {
            self.evicted_total.fetch_add(evicted, Ordering::Relaxed);
            debug!(evicted = %evicted, retained = %events.len(), "event_log_evicted");
        }
    }

    /// Newest-first events, optionally filtered by vehicle, truncated to `limit`
    /// (or the configured default).
    pub fn query(&self, vehicle_id: Option<&str>, limit: Option<usize>) -> Vec<ZoneEvent> {
        let limit = limit.unwrap_or(self.default_limit);
        let events = self.events.lock();

        events
            .iter()
            .rev()
            .filter(|e| vehicle_id.map_or(true, |v| e.vehicle_id == v))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn evicted_total(&self) -> u64 {
        self.evicted_total.load(Ordering::Relaxed)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETAINED, DEFAULT_QUERY_LIMIT)
    }
}

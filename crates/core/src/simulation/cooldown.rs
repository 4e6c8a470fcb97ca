//! Per-spill re-run cooldown
//!
//! Guards against runaway recomputation when an external scheduler asks for
//! the same spill again and again. A spill is marked in flight when its run is
//! admitted and stamped with the completion time when the run succeeds. A new
//! request is rejected while the spill is in flight or inside the window after
//! its last completion. Runs that fail or are cancelled release the entry.
//!
//! Expired entries are evicted when a request is admitted and the map has
//! grown past its pruning threshold. The threshold then doubles over the live
//! entry count, so a map full of active spills is not rescanned on every call.
//!
//! Time comes from an injected [`Clock`] so tests can drive it by hand.

use crate::core_types::SpillId;
use crate::error::DispersionError;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of monotonic time
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Wall-clock [`Clock`] backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven [`Clock`] for deterministic tests and replays
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// A clock frozen at its creation instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += by;
    }

    /// Time advanced since creation
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    InFlight,
    CompletedAt(Instant),
}

#[derive(Debug)]
struct Table {
    entries: FxHashMap<SpillId, Entry>,
    prune_at: usize,
}

impl Table {
    fn evict_expired(&mut self, now: Instant, window: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| match entry {
            Entry::InFlight => true,
            Entry::CompletedAt(done) => now.saturating_duration_since(*done) < window,
        });
        before - self.entries.len()
    }
}

/// Concurrency-safe map of spill id → last run state
#[derive(Debug)]
pub struct CooldownTracker {
    window: Duration,
    clock: Arc<dyn Clock>,
    prune_threshold: usize,
    table: Mutex<Table>,
}

impl CooldownTracker {
    /// Tracker on the system clock
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    /// Tracked spills at which admission first evicts expired entries
    pub const DEFAULT_PRUNE_THRESHOLD: usize = 64;

    /// Tracker on an injected clock
    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            prune_threshold: Self::DEFAULT_PRUNE_THRESHOLD,
            table: Mutex::new(Table {
                entries: FxHashMap::default(),
                prune_at: Self::DEFAULT_PRUNE_THRESHOLD,
            }),
        }
    }

    /// Evict expired entries on admission once `threshold` spills are tracked
    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        self.prune_threshold = threshold;
        self.table
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .prune_at = threshold;
        self
    }

    /// Cooldown window
    pub fn window(&self) -> Duration {
        self.window
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a run for `spill_id`, marking it in flight
    ///
    /// The check and the mark happen under one lock, so two concurrent requests
    /// for the same spill cannot both be admitted.
    ///
    /// # Errors
    ///
    /// [`DispersionError::RateLimited`] while the spill is in flight or inside
    /// the cooldown window after its last completed run.
    pub fn try_acquire(&self, spill_id: &SpillId) -> Result<CooldownPermit<'_>, DispersionError> {
        let now = self.clock.now();
        let mut table = self.table();

        if table.entries.len() >= table.prune_at {
            let evicted = table.evict_expired(now, self.window);
            table.prune_at = (table.entries.len() * 2).max(self.prune_threshold);
            debug!(
                "Evicted {} expired cooldown entries, {} tracked, next prune at {}",
                evicted,
                table.entries.len(),
                table.prune_at
            );
        }

        match table.entries.get(spill_id) {
            Some(Entry::InFlight) => {
                debug!("Spill {} rejected: run already in flight", spill_id);
                return Err(DispersionError::RateLimited {
                    spill_id: spill_id.clone(),
                    retry_after: Duration::ZERO,
                });
            }
            Some(Entry::CompletedAt(done)) => {
                let since = now.saturating_duration_since(*done);
                if since < self.window {
                    debug!(
                        "Spill {} rejected: completed {:.2}s ago, cooldown {:.2}s",
                        spill_id,
                        since.as_secs_f64(),
                        self.window.as_secs_f64()
                    );
                    return Err(DispersionError::RateLimited {
                        spill_id: spill_id.clone(),
                        retry_after: self.window - since,
                    });
                }
            }
            None => {}
        }

        table.entries.insert(spill_id.clone(), Entry::InFlight);
        Ok(CooldownPermit {
            tracker: self,
            spill_id: spill_id.clone(),
            completed: false,
        })
    }

    /// Time until a new run of `spill_id` would be admitted; zero if it would be now
    ///
    /// `None` while a run is in flight.
    pub fn remaining(&self, spill_id: &SpillId) -> Option<Duration> {
        let now = self.clock.now();
        match self.table().entries.get(spill_id) {
            Some(Entry::InFlight) => None,
            Some(Entry::CompletedAt(done)) => {
                Some(self.window.saturating_sub(now.saturating_duration_since(*done)))
            }
            None => Some(Duration::ZERO),
        }
    }

    /// Whether a run for `spill_id` is currently in flight
    pub fn is_in_flight(&self, spill_id: &SpillId) -> bool {
        matches!(self.table().entries.get(spill_id), Some(Entry::InFlight))
    }

    /// Drop completed entries whose window has expired; returns how many were removed
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        self.table().evict_expired(now, self.window)
    }

    /// Number of tracked spills
    pub fn len(&self) -> usize {
        self.table().entries.len()
    }

    /// Whether no spill is tracked
    pub fn is_empty(&self) -> bool {
        self.table().entries.is_empty()
    }

    fn finish(&self, spill_id: &SpillId, completed: bool) {
        let mut table = self.table();
        if completed {
            table.entries.insert(spill_id.clone(), Entry::CompletedAt(self.clock.now()));
        } else {
            table.entries.remove(spill_id);
        }
    }
}

/// Admission to run one spill
///
/// Call [`CooldownPermit::complete`] after a successful run to start the
/// cooldown window. Dropping the permit without completing releases the spill.
#[derive(Debug)]
#[must_use = "dropping the permit releases the spill immediately"]
pub struct CooldownPermit<'a> {
    tracker: &'a CooldownTracker,
    spill_id: SpillId,
    completed: bool,
}

impl CooldownPermit<'_> {
    /// Spill this permit admits
    pub fn spill_id(&self) -> &SpillId {
        &self.spill_id
    }

    /// Stamp the completion time, starting the cooldown window
    pub fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for CooldownPermit<'_> {
    fn drop(&mut self) {
        self.tracker.finish(&self.spill_id, self.completed);
    }
}

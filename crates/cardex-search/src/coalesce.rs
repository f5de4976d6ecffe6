//! Request coalescing (single-flight) for identical concurrent searches.
//!
//! When several callers issue the same search at the same moment, only the
//! first ("leader") runs the producer; the rest ("joiners") await the same
//! shared flight and clone its result. This is purely a thundering-herd
//! guard: a settled flight removes itself from the map immediately, so
//! nothing is cached and sequential identical requests each execute.
//!
//! Design:
//! - One `Mutex<HashMap>` guards the in-flight map. The critical sections
//!   are synchronous and short (lookup + insert); the producer itself runs
//!   outside the lock.
//! - Flights are `Shared` futures driven by whichever caller polls them,
//!   so a cancelled leader does not strand its joiners.
//! - A failed leader yields the same error message to every joiner; store
//!   errors are not `Clone`, so failures are shared by message.
//! - Atomic counters track leader/joiner/failure events for observability.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::debug;

use cardex_core::{Error, Result};

type SharedFlight<V> = Shared<BoxFuture<'static, std::result::Result<V, String>>>;

struct Flight<V> {
    /// Distinguishes this flight from a later one under the same key, so a
    /// settled flight removes only its own entry.
    generation: u64,
    future: SharedFlight<V>,
}

struct Inner<V> {
    flights: Mutex<HashMap<String, Flight<V>>>,
    next_generation: AtomicU64,
    leader_count: AtomicU64,
    joined_count: AtomicU64,
    failed_count: AtomicU64,
}

/// Outcome of a coalesced operation.
#[derive(Debug)]
pub enum CoalesceOutcome<V> {
    /// This caller executed the producer (was the leader).
    Executed(V),
    /// This caller joined an in-flight operation and shares its result.
    Joined(V),
}

impl<V> CoalesceOutcome<V> {
    /// Unwrap the inner value regardless of role.
    pub fn into_inner(self) -> V {
        match self {
            Self::Executed(v) | Self::Joined(v) => v,
        }
    }

    /// True when this result came from another caller's in-flight
    /// operation, meaning no redundant store work was performed.
    #[must_use]
    pub const fn was_joined(&self) -> bool {
        matches!(self, Self::Joined(_))
    }
}

/// Snapshot of coalescing counters.
#[derive(Debug, Clone, Default)]
pub struct CoalesceMetrics {
    /// Times a caller became the leader and executed the producer.
    pub leader_count: u64,
    /// Times a caller joined an in-flight operation.
    pub joined_count: u64,
    /// Flights that settled with an error.
    pub failed_count: u64,
}

/// Deduplicates identical in-flight operations keyed by canonical request
/// string.
///
/// Clones share the same in-flight map.
#[derive(Clone)]
pub struct RequestCoalescer<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Default for RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                flights: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                leader_count: AtomicU64::new(0),
                joined_count: AtomicU64::new(0),
                failed_count: AtomicU64::new(0),
            }),
        }
    }

    /// Execute `producer`, or join an in-flight execution under the same
    /// key.
    ///
    /// The first caller for a key becomes the leader and runs the
    /// producer; concurrent callers for the same key await the shared
    /// flight and clone its result. The entry is removed as soon as the
    /// flight settles, success or failure, so later calls execute afresh.
    pub async fn coalesce<F>(&self, key: &str, producer: F) -> Result<CoalesceOutcome<V>>
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        let (flight, joined) = {
            let mut flights = self
                .inner
                .flights
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match flights.get(key) {
                Some(existing) => (existing.future.clone(), true),
                None => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    let future = self.make_flight(key.to_string(), generation, producer);
                    flights.insert(
                        key.to_string(),
                        Flight {
                            generation,
                            future: future.clone(),
                        },
                    );
                    (future, false)
                }
            }
        };

        if joined {
            self.inner.joined_count.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Joined in-flight request");
        } else {
            self.inner.leader_count.fetch_add(1, Ordering::Relaxed);
        }

        match flight.await {
            Ok(value) => Ok(if joined {
                CoalesceOutcome::Joined(value)
            } else {
                CoalesceOutcome::Executed(value)
            }),
            Err(message) => Err(Error::Search(message)),
        }
    }

    /// Wrap the producer so the flight removes its own map entry as its
    /// last act, whatever the outcome.
    fn make_flight<F>(&self, key: String, generation: u64, producer: F) -> SharedFlight<V>
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        async move {
            let result = producer.await.map_err(|e| e.to_string());
            if result.is_err() {
                inner.failed_count.fetch_add(1, Ordering::Relaxed);
            }
            let mut flights = inner.flights.lock().unwrap_or_else(PoisonError::into_inner);
            // A newer flight may already occupy the key; leave it alone.
            if flights
                .get(&key)
                .is_some_and(|f| f.generation == generation)
            {
                flights.remove(&key);
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Number of flights currently in the air.
    pub fn inflight_count(&self) -> usize {
        self.inner
            .flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> CoalesceMetrics {
        CoalesceMetrics {
            leader_count: self.inner.leader_count.load(Ordering::Relaxed),
            joined_count: self.inner.joined_count.load(Ordering::Relaxed),
            failed_count: self.inner.failed_count.load(Ordering::Relaxed),
        }
    }

    /// Detach every in-flight entry. Running flights still settle for
    /// their awaiters; new callers execute afresh.
    pub fn clear(&self) {
        self.inner
            .flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

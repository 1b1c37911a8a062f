//! Process-wide registry of in-flight requests
//!
//! Every fetch registers a [`RequestHandle`] under the [`CancelGroup`] of the
//! crawl cycle it belongs to. The handle deregisters itself on drop, so the
//! registry is cleaned up on success, failure, cancellation and when the
//! fetching future itself is dropped.
//!
//! Groups are numbered by a monotonically increasing generation. Starting a
//! new generation cancels the previous group and everything still in flight;
//! a request of an older generation that completes late reports `Cancelled`
//! instead of handing back its result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

struct InFlight {
    generation: u64,
    url: String,
    token: CancellationToken,
}

#[derive(Default)]
struct RegistryState {
    current_group: Option<CancellationToken>,
    in_flight: HashMap<u64, InFlight>,
}

/// Tracks every in-flight request so they can be cancelled as a unit
pub struct CancellationRegistry {
    generation: AtomicU64,
    next_request_id: AtomicU64,
    state: Mutex<RegistryState>,
}

impl CancellationRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            generation: AtomicU64::new(0),
            next_request_id: AtomicU64::new(0),
            state: Mutex::new(RegistryState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new generation, superseding the previous one
    ///
    /// The previous group is cancelled together with all of its requests.
    pub fn begin_generation(self: &Arc<Self>) -> CancelGroup {
        let token = CancellationToken::new();
        let previous = self.lock().current_group.replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        self.cancel_all();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Started cancellation generation {}", generation);

        CancelGroup {
            registry: Arc::clone(self),
            generation,
            token,
        }
    }

    /// Cancels every registered request and clears the registry
    ///
    /// Safe to call with nothing in flight. Returns the number of requests
    /// that were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<InFlight> = self.lock().in_flight.drain().map(|(_, r)| r).collect();

        for request in &drained {
            tracing::trace!(
                "Cancelling request (generation {}): {}",
                request.generation,
                request.url
            );
            request.token.cancel();
        }

        if drained.is_empty() {
            tracing::debug!("No pending requests");
        } else {
            tracing::info!("Cancelling {} pending requests", drained.len());
        }

        drained.len()
    }

    /// Number of requests currently registered
    pub fn pending(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Generation of the most recently started group (0 before the first)
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn register(self: &Arc<Self>, group: &CancelGroup, url: &str) -> RequestHandle {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let token = group.token.child_token();

        self.lock().in_flight.insert(
            id,
            InFlight {
                generation: group.generation,
                url: url.to_string(),
                token: token.clone(),
            },
        );

        RequestHandle {
            registry: Arc::clone(self),
            id,
            token,
        }
    }

    fn deregister(&self, id: u64) {
        self.lock().in_flight.remove(&id);
    }
}

/// Cancellation context of one crawl cycle
///
/// Cloning shares the same generation. Passed by reference to every fetch.
#[derive(Clone)]
pub struct CancelGroup {
    registry: Arc<CancellationRegistry>,
    generation: u64,
    token: CancellationToken,
}

impl CancelGroup {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancels this group and all of its requests; idempotent
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancelled explicitly or superseded by a newer generation
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.is_stale()
    }

    /// True if a newer generation has been started since this one
    pub fn is_stale(&self) -> bool {
        self.registry.current_generation() != self.generation
    }

    /// Resolves once the group is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub(crate) fn register(&self, url: &str) -> RequestHandle {
        self.registry.register(self, url)
    }
}

/// Registration of one in-flight request; deregisters on drop
pub(crate) struct RequestHandle {
    registry: Arc<CancellationRegistry>,
    id: u64,
    token: CancellationToken,
}

impl RequestHandle {
    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl Drop for RequestHandle {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

//! services/client/src/app/inflight.rs
//!
//! Book-keeping for requests that are currently outstanding.
//!
//! Reads and "process" requests are exclusive per key: starting one cancels
//! the previous request for the same (operation, session) pair, and only the
//! newest one may apply its result. Creating sessions and adding feedback are
//! shared: each submission is its own intent and nothing supersedes it.
//!
//! A `Ticket` deregisters itself when dropped, so a request whose future is
//! abandoned half way never shows up as pending afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkthrough_core::domain::SessionId;
use walkthrough_core::ports::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub operation: Operation,
    pub session_id: Option<SessionId>,
}

impl RequestKey {
    pub fn new(operation: Operation, session_id: SessionId) -> Self {
        Self {
            operation,
            session_id: Some(session_id),
        }
    }

    /// A key for operations that are not about one session.
    pub fn global(operation: Operation) -> Self {
        Self {
            operation,
            session_id: None,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_generation: u64,
    exclusive: HashMap<RequestKey, (u64, CancellationToken)>,
    shared: HashMap<RequestKey, HashSet<u64>>,
}

impl Registry {
    fn is_current(&self, key: &RequestKey, generation: u64, exclusive: bool) -> bool {
        if exclusive {
            matches!(self.exclusive.get(key), Some((current, _)) if *current == generation)
        } else {
            self.shared
                .get(key)
                .is_some_and(|live| live.contains(&generation))
        }
    }

    /// Removes the entry for this generation if it is still registered.
    /// Returns whether it was.
    fn retire(&mut self, key: &RequestKey, generation: u64, exclusive: bool) -> bool {
        if exclusive {
            if self.is_current(key, generation, true) {
                self.exclusive.remove(key);
                return true;
            }
            return false;
        }
        let Some(live) = self.shared.get_mut(key) else {
            return false;
        };
        let removed = live.remove(&generation);
        if live.is_empty() {
            self.shared.remove(key);
        }
        removed
    }
}

/// Registry of outstanding requests. Cloning yields another handle to the
/// same registry.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    registry: Arc<Mutex<Registry>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a request that supersedes any in-flight one with the same key.
    pub fn begin_exclusive(&self, key: RequestKey) -> Ticket {
        let mut registry = self.lock();
        registry.next_generation += 1;
        let generation = registry.next_generation;
        let token = CancellationToken::new();
        if let Some((_, previous)) = registry.exclusive.insert(key, (generation, token.clone())) {
            debug!("Superseding in-flight request {:?}", key);
            previous.cancel();
        }
        self.ticket(key, generation, true, token)
    }

    /// Registers a request that runs alongside others with the same key.
    pub fn begin_shared(&self, key: RequestKey) -> Ticket {
        let mut registry = self.lock();
        registry.next_generation += 1;
        let generation = registry.next_generation;
        registry.shared.entry(key).or_default().insert(generation);
        self.ticket(key, generation, false, CancellationToken::new())
    }

    fn ticket(
        &self,
        key: RequestKey,
        generation: u64,
        exclusive: bool,
        token: CancellationToken,
    ) -> Ticket {
        Ticket {
            key,
            generation,
            exclusive,
            token,
            registry: self.clone(),
            retired: false,
        }
    }

    pub fn is_pending(&self, key: &RequestKey) -> bool {
        let registry = self.lock();
        registry.exclusive.contains_key(key) || registry.shared.contains_key(key)
    }

    /// Cancels every exclusive request and forgets all outstanding tickets.
    /// Tickets issued before the call retire without touching newer ones.
    pub fn cancel_all(&self) {
        let mut registry = self.lock();
        for (_, (_, token)) in registry.exclusive.drain() {
            token.cancel();
        }
        registry.shared.clear();
    }
}

/// Handle for one issued request. Dropping it without `finish` deregisters it.
#[derive(Debug)]
pub struct Ticket {
    key: RequestKey,
    generation: u64,
    exclusive: bool,
    token: CancellationToken,
    registry: InFlight,
    retired: bool,
}

impl Ticket {
    pub fn key(&self) -> RequestKey {
        self.key
    }

    /// Fires when a newer request for the same key supersedes this one.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Retires the ticket. Returns `false` when an exclusive ticket was
    /// superseded (or cancelled), in which case its result must be dropped.
    /// Shared tickets always may apply their result.
    pub fn finish(mut self) -> bool {
        self.retired = true;
        let retired = self
            .registry
            .lock()
            .retire(&self.key, self.generation, self.exclusive);
        retired || !self.exclusive
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.retired {
            return;
        }
        let released = self
            .registry
            .lock()
            .retire(&self.key, self.generation, self.exclusive);
        if released {
            debug!("Request {:?} abandoned before completing", self.key);
        }
    }
}

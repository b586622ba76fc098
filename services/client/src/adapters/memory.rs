//! services/client/src/adapters/memory.rs
//!
//! Volatile `AuthStorage` for tests and for runs that must not touch disk.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use walkthrough_core::domain::AuthSession;
use walkthrough_core::ports::{AuthStorage, PortError, PortResult};

#[derive(Debug, Default)]
pub struct MemoryAuthStorage {
    slot: Mutex<Option<AuthSession>>,
    saves: AtomicUsize,
}

impl MemoryAuthStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(auth: AuthSession) -> Self {
        Self {
            slot: Mutex::new(Some(auth)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl AuthStorage for MemoryAuthStorage {
    fn load(&self) -> PortResult<Option<AuthSession>> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(slot.clone())
    }

    fn save(&self, auth: Option<&AuthSession>) -> PortResult<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        *slot = auth.cloned();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

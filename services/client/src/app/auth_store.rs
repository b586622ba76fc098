//! services/client/src/app/auth_store.rs
//!
//! The process-wide holder of the current identity.
//!
//! There is exactly one `AuthStore` per application; it is constructed at
//! startup and handed to whatever needs it as an `Arc<AuthStore>`. Every
//! mutation is written through to the `AuthStorage` port and published on a
//! `watch` channel so observers such as the extension bridge see each change.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use walkthrough_core::domain::{AuthSession, User};
use walkthrough_core::ports::{AuthStorage, PortResult};

pub struct AuthStore {
    storage: Arc<dyn AuthStorage>,
    state: watch::Sender<Option<AuthSession>>,
}

impl AuthStore {
    /// Creates the store and restores whatever session the storage holds.
    /// Unreadable storage is treated as logged out.
    pub fn new(storage: Arc<dyn AuthStorage>) -> Self {
        let restored = match storage.load() {
            Ok(restored) => restored,
            Err(e) => {
                warn!("Failed to restore auth session, starting logged out: {}", e);
                None
            }
        };
        if let Some(auth) = &restored {
            info!("Restored auth session for {}", auth.user.email);
        }
        let (state, _) = watch::channel(restored);
        Self { storage, state }
    }

    pub fn set_auth(&self, token: impl Into<String>, user: User) {
        let auth = AuthSession::new(token, user);
        self.persist(Some(&auth));
        info!("Authenticated as {}", auth.user.email);
        self.state.send_replace(Some(auth));
    }

    pub fn logout(&self) {
        let was_logged_in = self.state.send_if_modified(|current| current.take().is_some());
        self.persist(None);
        if was_logged_in {
            info!("Logged out");
        }
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|auth| auth.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().as_ref().map(|auth| auth.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// A receiver that is woken on every change of the auth session.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.state.subscribe()
    }

    /// Re-reads durable storage and publishes it if it differs from memory.
    /// Returns whether anything changed.
    pub fn reload(&self) -> PortResult<bool> {
        let stored = self.storage.load()?;
        Ok(self.state.send_if_modified(move |current| {
            if *current == stored {
                false
            } else {
                *current = stored;
                true
            }
        }))
    }

    /// Like `reload`, but never fails: storage that cannot be read is
    /// treated as logged out, the same way it is at startup.
    pub fn refresh(&self) -> bool {
        match self.reload() {
            Ok(changed) => changed,
            Err(e) => {
                warn!("Failed to re-read auth session, treating as logged out: {}", e);
                self.state.send_if_modified(|current| current.take().is_some())
            }
        }
    }

    // A failed write keeps the in-memory session; the user stays logged in
    // for this run only.
    fn persist(&self, auth: Option<&AuthSession>) {
        if let Err(e) = self.storage.save(auth) {
            warn!("Failed to persist auth session: {}", e);
        }
    }
}

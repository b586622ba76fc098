//! services/client/src/app/bridge.rs
//!
//! Mirrors the current auth token out to the browser extension.
//!
//! The bridge watches the `AuthStore` and posts one message per token change
//! to its origin on a `MessageChannel`. Delivery is fire-and-forget: a failed
//! post is logged and never retried.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkthrough_core::domain::BridgeMessage;
use walkthrough_core::ports::MessageChannel;

use crate::app::auth_store::AuthStore;

pub struct ExtensionBridge {
    auth: Arc<AuthStore>,
    channel: Arc<dyn MessageChannel>,
    origin: String,
}

/// The message owed to the extension when the token goes from `previous` to
/// `current`, if any.
pub fn transition(previous: Option<&str>, current: Option<&str>) -> Option<BridgeMessage> {
    match (previous, current) {
        (previous, Some(token)) if previous != Some(token) => Some(BridgeMessage::Auth {
            token: token.to_string(),
        }),
        (Some(_), None) => Some(BridgeMessage::Logout),
        _ => None,
    }
}

impl ExtensionBridge {
    pub fn new(
        auth: Arc<AuthStore>,
        channel: Arc<dyn MessageChannel>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            channel,
            origin: origin.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Sends the current state once: the token when logged in, otherwise an
    /// explicit logout so the extension drops anything it still holds.
    pub async fn announce(&self) {
        let message = match self.auth.token() {
            Some(token) => BridgeMessage::Auth { token },
            None => BridgeMessage::Logout,
        };
        self.deliver(&message).await;
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Forwards token changes until `shutdown` fires or the store goes away.
    ///
    /// A token already held at start is sent immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut rx = self.auth.subscribe();
        let mut last = rx.borrow_and_update().as_ref().map(|a| a.token.clone());
        info!("Extension bridge started for {}", self.origin);

        if let Some(message) = transition(None, last.as_deref()) {
            self.deliver(&message).await;
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = rx.borrow_and_update().as_ref().map(|a| a.token.clone());
                    if let Some(message) = transition(last.as_deref(), current.as_deref()) {
                        self.deliver(&message).await;
                    }
                    last = current;
                }
            }
        }
        info!("Extension bridge stopped");
    }

    async fn deliver(&self, message: &BridgeMessage) {
        match self.channel.post(&self.origin, message).await {
            Ok(()) => debug!("Posted {} message to {}", kind(message), self.origin),
            Err(e) => debug!("Bridge message to {} not delivered: {}", self.origin, e),
        }
    }
}

fn kind(message: &BridgeMessage) -> &'static str {
    match message {
        BridgeMessage::Auth { .. } => "auth",
        BridgeMessage::Logout => "logout",
    }
}

//! crates/walkthrough_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any HTTP or serialization format; the
//! adapters map their own wire records onto them.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

pub type SessionId = i64;
pub type FeedbackId = i64;
pub type EventId = i64;
pub type UserId = i64;

//=========================================================================================
// Sessions
//=========================================================================================

/// Processing status of a walkthrough session.
///
/// The variant order is the lifecycle order, so `Ord` gives
/// `Created < Processing < Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionStatus {
    Created,
    Processing,
    Ready,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Created => "CREATED",
            SessionStatus::Processing => "PROCESSING",
            SessionStatus::Ready => "READY",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown session status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(SessionStatus::Created),
            "PROCESSING" => Ok(SessionStatus::Processing),
            "READY" => Ok(SessionStatus::Ready),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A walkthrough-recording unit tracked through a processing lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub status: SessionStatus,
    pub script_text: Option<String>,
    pub audio_file_name: Option<String>,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A partial session as returned by the server after a processing request.
///
/// `None` means the server did not send the field. For the nullable fields,
/// `Some(None)` means the server explicitly sent `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub id: SessionId,
    pub name: Option<String>,
    pub status: Option<SessionStatus>,
    pub script_text: Option<Option<String>>,
    pub audio_file_name: Option<Option<String>>,
    pub user_id: Option<UserId>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionPatch {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

impl Session {
    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }

    /// Merges a server patch into this session.
    ///
    /// Returns `false` without touching anything when the patch is for another
    /// session. The status only ever moves forward, and a ready session keeps
    /// its script even if the patch carries an explicit `null`.
    pub fn apply(&mut self, patch: &SessionPatch) -> bool {
        if patch.id != self.id {
            return false;
        }

        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(status) = patch.status {
            self.status = self.status.max(status);
        }
        match &patch.script_text {
            Some(Some(text)) => self.script_text = Some(text.clone()),
            Some(None) if self.status < SessionStatus::Ready => self.script_text = None,
            _ => {}
        }
        if let Some(audio) = &patch.audio_file_name {
            self.audio_file_name = audio.clone();
        }
        if let Some(user_id) = patch.user_id {
            self.user_id = Some(user_id);
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = created_at;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
        true
    }

    /// Replaces this session with a freshly listed copy of itself, keeping the
    /// furthest status either copy has reached.
    pub fn absorb(&mut self, fresh: Session) -> bool {
        if fresh.id != self.id {
            return false;
        }
        let status = self.status.max(fresh.status);
        let keep_script = fresh.script_text.is_none() && status == SessionStatus::Ready;
        let script_text = if keep_script {
            self.script_text.take()
        } else {
            fresh.script_text.clone()
        };
        *self = Session {
            status,
            script_text,
            ..fresh
        };
        true
    }
}

//=========================================================================================
// Feedback and extension events
//=========================================================================================

/// A free-text review attached to a session's generated script.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub id: FeedbackId,
    pub session_id: SessionId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One captured step of an extension event. The payload is opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct Step(pub serde_json::Value);

impl Step {
    pub fn message(&self) -> Option<&str> {
        self.0.get("message").and_then(|m| m.as_str())
    }

    /// The human-readable message, or the compact JSON of the step when it has none.
    pub fn label(&self) -> String {
        match self.message() {
            Some(message) => message.to_string(),
            None => self.0.to_string(),
        }
    }
}

/// A page-context capture reported by the companion browser extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionEvent {
    pub id: EventId,
    pub session_id: SessionId,
    pub url: String,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

//=========================================================================================
// Identity
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// The current authenticated identity.
///
/// Holding the token and the user in one value means "logged out" is simply
/// `Option::<AuthSession>::None`; there is no way to hold one without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

impl AuthSession {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

/// What the bridge tells the extension about the current identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
    Auth { token: String },
    Logout,
}

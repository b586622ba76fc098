//! crates/walkthrough_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the HTTP backend, the storage used for the auth session
//! and the channel that reaches the browser extension.

use async_trait::async_trait;
use std::fmt;

use crate::domain::{
    AuthSession, BridgeMessage, ExtensionEvent, Feedback, Session, SessionId, SessionPatch,
};

//=========================================================================================
// Operations
//=========================================================================================

/// Every remote operation the client can issue. Used to label failures and to
/// key in-flight requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Signup,
    Login,
    CreateSession,
    ListSessions,
    ProcessSession,
    ListFeedback,
    AddFeedback,
    ListExtensionEvents,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Signup => "sign up",
            Operation::Login => "log in",
            Operation::CreateSession => "create session",
            Operation::ListSessions => "list sessions",
            Operation::ProcessSession => "process session",
            Operation::ListFeedback => "list feedback",
            Operation::AddFeedback => "add feedback",
            Operation::ListExtensionEvents => "list extension events",
        }
    }

    /// Whether the backend expects a bearer token for this operation.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Operation::Signup | Operation::Login)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Coarse classification of a [`PortError`], so callers can decide between
/// prompting a re-login, showing a validation hint or offering a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    Validation,
    NotFound,
    Transient,
    Cancelled,
    Internal,
}

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Not logged in: cannot {0} without an auth token")]
    AuthenticationAbsent(Operation),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to {operation}: unauthorized ({message})")]
    Unauthorized { operation: Operation, message: String },

    #[error("Failed to {operation}: not found ({message})")]
    NotFound { operation: Operation, message: String },

    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    #[error("Failed to {operation}: HTTP {status} ({message})")]
    Http {
        operation: Operation,
        status: u16,
        message: String,
    },

    #[error("Failed to {operation}: {message}")]
    Transport { operation: Operation, message: String },

    #[error("Failed to {operation}: unexpected response body: {message}")]
    Decode { operation: Operation, message: String },

    #[error("Request to {0} was superseded by a newer one")]
    Superseded(Operation),

    #[error("Auth storage error: {0}")]
    Storage(String),

    #[error("Bridge channel error: {0}")]
    Channel(String),
}

impl PortError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PortError::AuthenticationAbsent(_) | PortError::Unauthorized { .. } => {
                FailureKind::Authentication
            }
            PortError::Validation(_) => FailureKind::Validation,
            PortError::NotFound { .. } | PortError::SessionNotFound(_) => FailureKind::NotFound,
            PortError::Http { status, .. } if (400..500).contains(status) => {
                FailureKind::Validation
            }
            PortError::Http { .. } | PortError::Transport { .. } => FailureKind::Transient,
            PortError::Superseded(_) => FailureKind::Cancelled,
            PortError::Decode { .. } | PortError::Storage(_) | PortError::Channel(_) => {
                FailureKind::Internal
            }
        }
    }

    /// Only transient failures are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Session, feedback and extension-event endpoints of the backend.
///
/// Implementations attach the current bearer token and must fail with
/// [`PortError::AuthenticationAbsent`] instead of sending a request when no
/// token is held.
#[async_trait]
pub trait SessionsApi: Send + Sync {
    async fn create_session(&self, name: &str) -> PortResult<Session>;

    /// Sessions owned by the caller.
    async fn list_sessions(&self) -> PortResult<Vec<Session>>;

    /// Asks the backend to (re)process a session and returns whatever part of
    /// the session it sent back.
    async fn process_session(&self, session_id: SessionId) -> PortResult<SessionPatch>;

    async fn list_feedback(&self, session_id: SessionId) -> PortResult<Vec<Feedback>>;

    async fn add_feedback(&self, session_id: SessionId, text: &str) -> PortResult<Feedback>;

    async fn list_extension_events(&self, session_id: SessionId)
        -> PortResult<Vec<ExtensionEvent>>;
}

/// Unauthenticated account endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn signup(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthSession>;
}

/// Durable storage for the auth session.
pub trait AuthStorage: Send + Sync {
    fn load(&self) -> PortResult<Option<AuthSession>>;

    /// Persists the given session, or clears storage when `None`.
    fn save(&self, auth: Option<&AuthSession>) -> PortResult<()>;
}

/// An origin-scoped, fire-and-forget channel to the browser extension.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn post(&self, origin: &str, message: &BridgeMessage) -> PortResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kinds_separate_auth_from_transient() {
        let unauthorized = PortError::Unauthorized {
            operation: Operation::ListSessions,
            message: "HTTP 401".to_string(),
        };
        let server = PortError::Http {
            operation: Operation::ProcessSession,
            status: 503,
            message: "unavailable".to_string(),
        };

        assert_eq!(unauthorized.kind(), FailureKind::Authentication);
        assert_eq!(
            PortError::AuthenticationAbsent(Operation::AddFeedback).kind(),
            FailureKind::Authentication
        );
        assert!(server.is_retryable());
        assert!(!unauthorized.is_retryable());
    }

    #[test]
    fn failure_message_names_the_operation() {
        let err = PortError::Http {
            operation: Operation::CreateSession,
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to create session: HTTP 500 (boom)");
    }

    #[test]
    fn only_account_endpoints_skip_auth() {
        assert!(!Operation::Login.requires_auth());
        assert!(!Operation::Signup.requires_auth());
        assert!(Operation::ListExtensionEvents.requires_auth());
    }
}

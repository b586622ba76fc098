pub mod domain;
pub mod ports;

pub use domain::{
    AuthSession, BridgeMessage, EventId, ExtensionEvent, Feedback, FeedbackId, Session,
    SessionId, SessionPatch, SessionStatus, Step, User, UserId,
};
pub use ports::{
    AuthApi, AuthStorage, FailureKind, MessageChannel, Operation, PortError, PortResult,
    SessionsApi,
};

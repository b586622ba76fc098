pub mod auth;
pub mod auth_store;
pub mod bridge;
pub mod controller;
pub mod inflight;
pub mod protocol;

// Re-export the pieces the binary wires together so they are easily
// accessible from one place.
pub use auth_store::AuthStore;
pub use bridge::ExtensionBridge;
pub use controller::{SessionDetail, SessionLifecycleController, SessionsView};

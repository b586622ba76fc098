//! services/client/src/app/auth.rs
//!
//! Account flows: signup, login and logout. These are the only writers of the
//! `AuthStore`.

use tracing::{error, info};
use walkthrough_core::domain::User;
use walkthrough_core::ports::{AuthApi, PortError, PortResult};

use crate::app::auth_store::AuthStore;

pub const MIN_PASSWORD_LEN: usize = 6;

fn validate_credentials(email: &str, password: &str) -> PortResult<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(PortError::Validation(format!(
            "'{}' is not an email address",
            email
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// POST /v1/auth/signup - creates the account and logs it in.
pub async fn signup(
    api: &dyn AuthApi,
    store: &AuthStore,
    email: &str,
    password: &str,
) -> PortResult<User> {
    let email = email.trim();
    validate_credentials(email, password)?;

    let auth = api.signup(email, password).await.map_err(|e| {
        error!("Signup failed: {}", e);
        e
    })?;
    info!("Signed up {}", auth.user.email);
    let user = auth.user.clone();
    store.set_auth(auth.token, auth.user);
    Ok(user)
}

/// POST /v1/auth/login - exchanges credentials for a token.
pub async fn login(
    api: &dyn AuthApi,
    store: &AuthStore,
    email: &str,
    password: &str,
) -> PortResult<User> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(PortError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let auth = api.login(email, password).await.map_err(|e| {
        error!("Login failed: {}", e);
        e
    })?;
    let user = auth.user.clone();
    store.set_auth(auth.token, auth.user);
    Ok(user)
}

/// Forgets the current identity. Purely local; the backend keeps no session.
pub fn logout(store: &AuthStore) {
    store.logout();
}

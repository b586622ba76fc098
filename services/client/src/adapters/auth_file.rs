//! services/client/src/adapters/auth_file.rs
//!
//! File-backed implementation of the `AuthStorage` port. The auth session is
//! kept as a small JSON document so that a returning user stays logged in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkthrough_core::domain::{AuthSession, User};
use walkthrough_core::ports::{AuthStorage, PortError, PortResult};

#[derive(Debug, Clone)]
pub struct FileAuthStorage {
    path: PathBuf,
}

impl FileAuthStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Serialize, Deserialize)]
struct StoredUser {
    id: i64,
    email: String,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
struct StoredAuth {
    token: String,
    user: StoredUser,
}

impl StoredAuth {
    fn from_domain(auth: &AuthSession) -> Self {
        Self {
            token: auth.token.clone(),
            user: StoredUser {
                id: auth.user.id,
                email: auth.user.email.clone(),
                created_at: auth.user.created_at,
            },
        }
    }

    fn to_domain(self) -> AuthSession {
        AuthSession::new(
            self.token,
            User {
                id: self.user.id,
                email: self.user.email,
                created_at: self.user.created_at,
            },
        )
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> PortError {
    PortError::Storage(format!("{}: {}", path.display(), err))
}

impl AuthStorage for FileAuthStorage {
    fn load(&self) -> PortResult<Option<AuthSession>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(&self.path, e)),
        };
        let stored: StoredAuth =
            serde_json::from_str(&raw).map_err(|e| storage_error(&self.path, e))?;
        Ok(Some(stored.to_domain()))
    }

    fn save(&self, auth: Option<&AuthSession>) -> PortResult<()> {
        let Some(auth) = auth else {
            debug!("Clearing stored auth at {}", self.path.display());
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(storage_error(&self.path, e)),
            };
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| storage_error(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(&StoredAuth::from_domain(auth))
            .map_err(|e| storage_error(&self.path, e))?;

        // Write-then-rename so a reader never sees a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| storage_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, e))?;
        debug!("Stored auth for {} at {}", auth.user.email, self.path.display());
        Ok(())
    }
}

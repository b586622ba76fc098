//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter, which is the concrete implementation
//! of the `SessionsApi` and `AuthApi` ports from the `core` crate. It handles all
//! interactions with the backend REST service using `reqwest`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use walkthrough_core::domain::{
    AuthSession, ExtensionEvent, Feedback, Session, SessionId, SessionPatch, SessionStatus, Step,
    User,
};
use walkthrough_core::ports::{AuthApi, Operation, PortError, PortResult, SessionsApi};

use crate::app::auth_store::AuthStore;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `SessionsApi` and `AuthApi` ports.
#[derive(Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<AuthStore>,
}

impl HttpApiClient {
    /// Creates a new `HttpApiClient` with its own connection pool.
    pub fn new(
        base_url: impl Into<String>,
        auth: Arc<AuthStore>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, auth))
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        auth: Arc<AuthStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The bearer token for a gated operation, or `AuthenticationAbsent` so
    /// that no unauthenticated request ever leaves the client.
    fn bearer(&self, operation: Operation) -> PortResult<String> {
        self.auth
            .token()
            .ok_or(PortError::AuthenticationAbsent(operation))
    }

    fn authorized(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> PortResult<RequestBuilder> {
        let token = self.bearer(operation)?;
        Ok(request.bearer_auth(token))
    }

    /// Sends a request and decodes a successful JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> PortResult<T> {
        debug!("Sending request to {}", operation);
        let response = request.send().await.map_err(|e| PortError::Transport {
            operation,
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| PortError::Transport {
            operation,
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let error = status_error(operation, status, &body);
            warn!("Request to {} failed: {}", operation, error);
            return Err(error);
        }

        serde_json::from_slice(&body).map_err(|e| PortError::Decode {
            operation,
            message: e.to_string(),
        })
    }
}

/// Maps a non-success status onto the tagged failure kinds.
fn status_error(operation: Operation, status: StatusCode, body: &[u8]) -> PortError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PortError::Unauthorized { operation, message }
        }
        StatusCode::NOT_FOUND => PortError::NotFound { operation, message },
        other => PortError::Http {
            operation,
            status: other.as_u16(),
            message,
        },
    }
}

fn decode_error(operation: Operation, message: impl ToString) -> PortError {
    PortError::Decode {
        operation,
        message: message.to_string(),
    }
}

//=========================================================================================
// Wire Request Structs
//=========================================================================================

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct FeedbackRequest<'a> {
    text: &'a str,
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Keeps "field sent as null" apart from "field not sent" for `Option<Option<T>>`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn parse_status(operation: Operation, raw: &str) -> PortResult<SessionStatus> {
    raw.parse::<SessionStatus>()
        .map_err(|e| decode_error(operation, e))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    id: i64,
    email: String,
    created_at: Option<DateTime<Utc>>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
struct AuthRecord {
    user: UserRecord,
    token: String,
}
impl AuthRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession::new(self.token, self.user.to_domain())
    }
}

/// A session as the backend returns it. Only `id` and `status` are certain;
/// a freshly created session may come back without its name or timestamps.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    status: String,
    #[serde(default)]
    script_text: Option<String>,
    #[serde(default)]
    audio_file_name: Option<String>,
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}
impl SessionRecord {
    /// Missing timestamps are taken as the time the response was decoded.
    fn to_domain(self, operation: Operation) -> PortResult<Session> {
        let received_at = Utc::now();
        let created_at = self.created_at.unwrap_or(received_at);
        Ok(Session {
            id: self.id,
            status: parse_status(operation, &self.status)?,
            name: self.name.unwrap_or_default(),
            script_text: self.script_text,
            audio_file_name: self.audio_file_name,
            user_id: self.user_id,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPatchRecord {
    id: i64,
    name: Option<String>,
    status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    script_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    audio_file_name: Option<Option<String>>,
    user_id: Option<i64>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}
impl SessionPatchRecord {
    fn to_domain(self, operation: Operation) -> PortResult<SessionPatch> {
        let status = match self.status.as_deref() {
            Some(raw) => Some(parse_status(operation, raw)?),
            None => None,
        };
        Ok(SessionPatch {
            id: self.id,
            name: self.name,
            status,
            script_text: self.script_text,
            audio_file_name: self.audio_file_name,
            user_id: self.user_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Deserialize)]
struct ProcessRecord {
    session: SessionPatchRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackRecord {
    id: i64,
    session_id: i64,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}
impl FeedbackRecord {
    fn to_domain(self) -> Feedback {
        Feedback {
            id: self.id,
            session_id: self.session_id,
            text: self.text,
            updated_at: self.updated_at.unwrap_or(self.created_at),
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionEventRecord {
    id: i64,
    session_id: i64,
    url: String,
    steps: Option<Vec<serde_json::Value>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}
impl ExtensionEventRecord {
    fn to_domain(self) -> ExtensionEvent {
        ExtensionEvent {
            id: self.id,
            session_id: self.session_id,
            url: self.url,
            steps: self.steps.unwrap_or_default().into_iter().map(Step).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl AuthApi for HttpApiClient {
    async fn signup(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let request = self
            .http
            .post(self.url("/v1/auth/signup"))
            .json(&CredentialsRequest { email, password });
        let record: AuthRecord = self.send(Operation::Signup, request).await?;
        Ok(record.to_domain())
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let request = self
            .http
            .post(self.url("/v1/auth/login"))
            .json(&CredentialsRequest { email, password });
        let record: AuthRecord = self.send(Operation::Login, request).await?;
        Ok(record.to_domain())
    }
}

#[async_trait]
impl SessionsApi for HttpApiClient {
    async fn create_session(&self, name: &str) -> PortResult<Session> {
        let operation = Operation::CreateSession;
        let request = self.authorized(
            operation,
            self.http
                .post(self.url("/v1/sessions"))
                .json(&CreateSessionRequest { name }),
        )?;
        let mut record: SessionRecord = self.send(operation, request).await?;
        record.name.get_or_insert_with(|| name.to_string());
        record.to_domain(operation)
    }

    async fn list_sessions(&self) -> PortResult<Vec<Session>> {
        let operation = Operation::ListSessions;
        let request = self.authorized(operation, self.http.get(self.url("/v1/sessions")))?;
        let records: Vec<SessionRecord> = self.send(operation, request).await?;
        records
            .into_iter()
            .map(|r| r.to_domain(operation))
            .collect()
    }

    async fn process_session(&self, session_id: SessionId) -> PortResult<SessionPatch> {
        let operation = Operation::ProcessSession;
        let request = self.authorized(
            operation,
            self.http
                .post(self.url(&format!("/v1/sessions/{}/process", session_id))),
        )?;
        let record: ProcessRecord = self.send(operation, request).await?;
        record.session.to_domain(operation)
    }

    async fn list_feedback(&self, session_id: SessionId) -> PortResult<Vec<Feedback>> {
        let operation = Operation::ListFeedback;
        let request = self.authorized(
            operation,
            self.http
                .get(self.url(&format!("/v1/sessions/{}/feedback", session_id))),
        )?;
        let records: Vec<FeedbackRecord> = self.send(operation, request).await?;
        Ok(records.into_iter().map(FeedbackRecord::to_domain).collect())
    }

    async fn add_feedback(&self, session_id: SessionId, text: &str) -> PortResult<Feedback> {
        let operation = Operation::AddFeedback;
        let request = self.authorized(
            operation,
            self.http
                .post(self.url(&format!("/v1/sessions/{}/feedback", session_id)))
                .json(&FeedbackRequest { text }),
        )?;
        let record: FeedbackRecord = self.send(operation, request).await?;
        Ok(record.to_domain())
    }

    async fn list_extension_events(
        &self,
        session_id: SessionId,
    ) -> PortResult<Vec<ExtensionEvent>> {
        let operation = Operation::ListExtensionEvents;
        let request = self.authorized(
            operation,
            self.http
                .get(self.url(&format!("/v1/sessions/{}/extension-events", session_id))),
        )?;
        let records: Vec<ExtensionEventRecord> = self.send(operation, request).await?;
        Ok(records
            .into_iter()
            .map(ExtensionEventRecord::to_domain)
            .collect())
    }
}

//! services/client/src/app/controller.rs
//!
//! Orchestrates one view of sessions: loads sessions, feedback and extension
//! events through the `SessionsApi` port, exposes the mutation intents, and
//! reconciles server responses into local view state.
//!
//! The controller never moves a session through its lifecycle itself. It asks
//! the backend to process and merges whatever comes back into the session
//! with the matching id.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use walkthrough_core::domain::{ExtensionEvent, Feedback, Session, SessionId};
use walkthrough_core::ports::{Operation, PortError, PortResult, SessionsApi};

use crate::app::inflight::{InFlight, RequestKey, Ticket};

//=========================================================================================
// View State
//=========================================================================================

/// What the current view renders. Feedback and events are only held for the
/// sessions this view has loaded them for.
#[derive(Debug, Clone, Default)]
pub struct SessionsView {
    pub sessions: Vec<Session>,
    pub feedback: HashMap<SessionId, Vec<Feedback>>,
    pub events: HashMap<SessionId, Vec<ExtensionEvent>>,
    /// Transient error message for the user; cleared by `dismiss_notice`.
    pub notice: Option<String>,
}

impl SessionsView {
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn feedback_for(&self, id: SessionId) -> &[Feedback] {
        self.feedback.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn events_for(&self, id: SessionId) -> &[ExtensionEvent] {
        self.events.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Installs a freshly listed set of sessions in server order. Sessions
    /// already known keep the furthest status they reached.
    fn replace_sessions(&mut self, fresh: Vec<Session>) {
        let mut known: HashMap<SessionId, Session> =
            self.sessions.drain(..).map(|s| (s.id, s)).collect();
        self.sessions = fresh
            .into_iter()
            .map(|session| match known.remove(&session.id) {
                Some(mut local) => {
                    local.absorb(session);
                    local
                }
                None => session,
            })
            .collect();
    }
}

/// Everything the detail view of one session shows.
#[derive(Debug, Clone)]
pub struct SessionDetail {
    pub session: Session,
    pub feedback: Vec<Feedback>,
    pub events: Vec<ExtensionEvent>,
}

fn newest_first(feedback: &mut [Feedback]) {
    feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

//=========================================================================================
// Controller
//=========================================================================================

pub struct SessionLifecycleController {
    api: Arc<dyn SessionsApi>,
    view: Mutex<SessionsView>,
    inflight: InFlight,
}

impl SessionLifecycleController {
    pub fn new(api: Arc<dyn SessionsApi>) -> Self {
        Self {
            api,
            view: Mutex::new(SessionsView::default()),
            inflight: InFlight::new(),
        }
    }

    pub async fn snapshot(&self) -> SessionsView {
        self.view.lock().await.clone()
    }

    pub async fn session(&self, id: SessionId) -> Option<Session> {
        self.view.lock().await.session(id).cloned()
    }

    /// Whether a request for `operation` on `session_id` is outstanding, e.g.
    /// to show "Processing…" next to a session.
    pub async fn is_pending(&self, operation: Operation, session_id: Option<SessionId>) -> bool {
        let key = RequestKey {
            operation,
            session_id,
        };
        self.inflight.is_pending(&key)
    }

    pub async fn notice(&self) -> Option<String> {
        self.view.lock().await.notice.clone()
    }

    pub async fn dismiss_notice(&self) {
        self.view.lock().await.notice = None;
    }

    /// Cancels every outstanding request, e.g. when the view goes away.
    pub async fn deactivate(&self) {
        self.inflight.cancel_all();
    }

    //-------------------------------------------------------------------------------------
    // Sessions
    //-------------------------------------------------------------------------------------

    pub async fn load_sessions(&self) -> PortResult<Vec<Session>> {
        let key = RequestKey::global(Operation::ListSessions);
        let ticket = self.begin(key, true);
        let result = self.race(&ticket, self.api.list_sessions()).await;
        self.settle(ticket, result, |view, fresh| {
            info!("Loaded {} sessions", fresh.len());
            view.replace_sessions(fresh);
            view.sessions.clone()
        })
        .await
    }

    /// Creates a session named `name` (trimmed) and puts it at the top of the list.
    pub async fn create_session(&self, name: &str) -> PortResult<Session> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self
                .reject(PortError::Validation("session name is empty".to_string()))
                .await);
        }

        let ticket = self.begin(RequestKey::global(Operation::CreateSession), false);
        let result = self.race(&ticket, self.api.create_session(name)).await;
        self.settle(ticket, result, |view, created| {
            info!("Created session {} ({})", created.id, created.name);
            view.sessions.retain(|s| s.id != created.id);
            view.sessions.insert(0, created.clone());
            created
        })
        .await
    }

    /// Asks the backend to process a session and merges the returned fields
    /// into the local copy with the same id.
    ///
    /// Returns the merged session, or `None` when this view does not hold it.
    /// A second call for the same session supersedes the first; the first then
    /// fails with `Superseded` and its response is never applied.
    pub async fn process_session(&self, session_id: SessionId) -> PortResult<Option<Session>> {
        let key = RequestKey::new(Operation::ProcessSession, session_id);
        let ticket = self.begin(key, true);
        let result = self
            .race(&ticket, self.api.process_session(session_id))
            .await;
        self.settle(ticket, result, |view, patch| {
            if patch.id != session_id {
                warn!(
                    "Process response for session {} carried id {}, ignoring it",
                    session_id, patch.id
                );
            }
            let local = view.sessions.iter_mut().find(|s| s.id == session_id)?;
            if local.apply(&patch) {
                info!("Session {} is now {}", local.id, local.status);
            }
            Some(local.clone())
        })
        .await
    }

    //-------------------------------------------------------------------------------------
    // Feedback
    //-------------------------------------------------------------------------------------

    pub async fn load_feedback(&self, session_id: SessionId) -> PortResult<Vec<Feedback>> {
        let key = RequestKey::new(Operation::ListFeedback, session_id);
        let ticket = self.begin(key, true);
        let result = self.race(&ticket, self.api.list_feedback(session_id)).await;
        self.settle(ticket, result, |view, mut feedback| {
            newest_first(&mut feedback);
            view.feedback.insert(session_id, feedback.clone());
            feedback
        })
        .await
    }

    /// Submits trimmed feedback. Blank text is rejected before any request.
    /// On success the server's copy goes to the front of the session's list;
    /// on failure the list is left alone.
    pub async fn submit_feedback(&self, session_id: SessionId, text: &str) -> PortResult<Feedback> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self
                .reject(PortError::Validation("feedback text is empty".to_string()))
                .await);
        }

        let key = RequestKey::new(Operation::AddFeedback, session_id);
        let ticket = self.begin(key, false);
        let result = self
            .race(&ticket, self.api.add_feedback(session_id, text))
            .await;
        self.settle(ticket, result, |view, feedback| {
            debug!("Feedback {} saved for session {}", feedback.id, session_id);
            view.feedback
                .entry(session_id)
                .or_default()
                .insert(0, feedback.clone());
            feedback
        })
        .await
    }

    //-------------------------------------------------------------------------------------
    // Extension events
    //-------------------------------------------------------------------------------------

    pub async fn load_extension_events(
        &self,
        session_id: SessionId,
    ) -> PortResult<Vec<ExtensionEvent>> {
        let key = RequestKey::new(Operation::ListExtensionEvents, session_id);
        let ticket = self.begin(key, true);
        let result = self
            .race(&ticket, self.api.list_extension_events(session_id))
            .await;
        self.settle(ticket, result, |view, events| {
            view.events.insert(session_id, events.clone());
            events
        })
        .await
    }

    //-------------------------------------------------------------------------------------
    // Detail view
    //-------------------------------------------------------------------------------------

    /// Activates the detail view for one session: finds it among the caller's
    /// sessions, then fetches its feedback and extension events together.
    pub async fn open_session(&self, session_id: SessionId) -> PortResult<SessionDetail> {
        let sessions = self.load_sessions().await?;
        let Some(session) = sessions.into_iter().find(|s| s.id == session_id) else {
            return Err(self.reject(PortError::SessionNotFound(session_id)).await);
        };

        let (feedback, events) = tokio::try_join!(
            self.load_feedback(session_id),
            self.load_extension_events(session_id)
        )?;

        Ok(SessionDetail {
            session,
            feedback,
            events,
        })
    }

    //-------------------------------------------------------------------------------------
    // Request plumbing
    //-------------------------------------------------------------------------------------

    fn begin(&self, key: RequestKey, exclusive: bool) -> Ticket {
        if exclusive {
            self.inflight.begin_exclusive(key)
        } else {
            self.inflight.begin_shared(key)
        }
    }

    /// Runs the request unless the ticket gets superseded first.
    async fn race<T, F>(&self, ticket: &Ticket, request: F) -> PortResult<T>
    where
        F: Future<Output = PortResult<T>>,
    {
        tokio::select! {
            biased;
            _ = ticket.token().cancelled() => Err(PortError::Superseded(ticket.key().operation)),
            result = request => result,
        }
    }

    /// Retires the ticket and, if it is still current, applies the result to
    /// the view under the same lock.
    async fn settle<T, R, F>(
        &self,
        ticket: Ticket,
        result: PortResult<T>,
        apply: F,
    ) -> PortResult<R>
    where
        F: FnOnce(&mut SessionsView, T) -> R,
    {
        let mut view = self.view.lock().await;
        let key = ticket.key();
        if !ticket.finish() {
            debug!("Dropping superseded result for {:?}", key);
            return Err(PortError::Superseded(key.operation));
        }
        match result {
            Ok(value) => Ok(apply(&mut *view, value)),
            Err(e) => {
                error!("{}", e);
                view.notice = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn reject(&self, e: PortError) -> PortError {
        warn!("{}", e);
        self.view.lock().await.notice = Some(e.to_string());
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::oneshot;
    use walkthrough_core::domain::{SessionPatch, SessionStatus, Step};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn session(id: SessionId, name: &str, status: SessionStatus) -> Session {
        Session {
            id,
            name: name.to_string(),
            status,
            script_text: None,
            audio_file_name: None,
            user_id: Some(1),
            created_at: ts(id),
            updated_at: ts(id),
        }
    }

    fn feedback(id: i64, session_id: SessionId, text: &str, at: i64) -> Feedback {
        Feedback {
            id,
            session_id,
            text: text.to_string(),
            created_at: ts(at),
            updated_at: ts(at),
        }
    }

    /// In-memory backend. Process calls wait on a queued gate when one is
    /// queued, otherwise they answer from `process_reply`.
    #[derive(Default)]
    struct FakeApi {
        sessions: StdMutex<Vec<Session>>,
        feedback: StdMutex<Vec<Feedback>>,
        events: StdMutex<Vec<ExtensionEvent>>,
        process_reply: StdMutex<Option<SessionPatch>>,
        process_gates: StdMutex<VecDeque<oneshot::Receiver<SessionPatch>>>,
        fail_feedback: AtomicBool,
        fail_feedback_listing: AtomicBool,
        hang_events: AtomicBool,
        requests: AtomicUsize,
    }

    impl FakeApi {
        fn hit(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionsApi for FakeApi {
        async fn create_session(&self, name: &str) -> PortResult<Session> {
            self.hit();
            let mut sessions = self.sessions.lock().unwrap();
            let created = session(sessions.len() as i64 + 1, name, SessionStatus::Created);
            sessions.push(created.clone());
            Ok(created)
        }

        async fn list_sessions(&self) -> PortResult<Vec<Session>> {
            self.hit();
            Ok(self.sessions.lock().unwrap().clone())
        }

        async fn process_session(&self, session_id: SessionId) -> PortResult<SessionPatch> {
            self.hit();
            let gate = self.process_gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                return gate.await.map_err(|_| PortError::Transport {
                    operation: Operation::ProcessSession,
                    message: "gate dropped".to_string(),
                });
            }
            let reply = self.process_reply.lock().unwrap().clone();
            Ok(reply.unwrap_or_else(|| SessionPatch {
                status: Some(SessionStatus::Processing),
                ..SessionPatch::new(session_id)
            }))
        }

        async fn list_feedback(&self, session_id: SessionId) -> PortResult<Vec<Feedback>> {
            self.hit();
            if self.fail_feedback_listing.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
                return Err(PortError::Http {
                    operation: Operation::ListFeedback,
                    status: 500,
                    message: "x".to_string(),
                });
            }
            Ok(self
                .feedback
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.session_id == session_id)
                .cloned()
                .collect())
        }

        async fn add_feedback(&self, session_id: SessionId, text: &str) -> PortResult<Feedback> {
            self.hit();
            if self.fail_feedback.load(Ordering::SeqCst) {
                return Err(PortError::Http {
                    operation: Operation::AddFeedback,
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
            let created = feedback(10, session_id, text, 100);
            self.feedback.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn list_extension_events(
            &self,
            session_id: SessionId,
        ) -> PortResult<Vec<ExtensionEvent>> {
            self.hit();
            if self.hang_events.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.session_id == session_id)
                .cloned()
                .collect())
        }
    }

    fn controller(api: &Arc<FakeApi>) -> SessionLifecycleController {
        SessionLifecycleController::new(api.clone())
    }

    #[tokio::test]
    async fn onboarding_scenario_preserves_name() {
        let api = Arc::new(FakeApi::default());
        let ctl = controller(&api);

        let created = ctl.create_session("  Onboarding ").await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(created.status, SessionStatus::Created);
        assert_eq!(created.script_text, None);
        assert_eq!(ctl.load_sessions().await.unwrap().len(), 1);

        *api.process_reply.lock().unwrap() = Some(SessionPatch {
            status: Some(SessionStatus::Ready),
            script_text: Some(Some("Welcome...".to_string())),
            ..SessionPatch::new(1)
        });
        let merged = ctl.process_session(1).await.unwrap().unwrap();

        assert_eq!(merged.id, 1);
        assert_eq!(merged.name, "Onboarding");
        assert_eq!(merged.status, SessionStatus::Ready);
        assert_eq!(merged.script_text.as_deref(), Some("Welcome..."));
        assert!(!ctl.is_pending(Operation::ProcessSession, Some(1)).await);
    }

    #[tokio::test]
    async fn processing_one_session_leaves_others_alone() {
        let api = Arc::new(FakeApi::default());
        *api.sessions.lock().unwrap() = vec![
            session(4, "four", SessionStatus::Created),
            session(5, "five", SessionStatus::Created),
            session(6, "six", SessionStatus::Processing),
        ];
        let ctl = controller(&api);
        ctl.load_sessions().await.unwrap();
        let before = ctl.snapshot().await;

        *api.process_reply.lock().unwrap() = Some(SessionPatch {
            status: Some(SessionStatus::Ready),
            name: Some("renamed".to_string()),
            ..SessionPatch::new(5)
        });
        ctl.process_session(5).await.unwrap();

        let after = ctl.snapshot().await;
        assert_eq!(after.session(4), before.session(4));
        assert_eq!(after.session(6), before.session(6));
        assert_eq!(after.session(5).unwrap().status, SessionStatus::Ready);
    }

    #[tokio::test]
    async fn process_reply_for_another_id_is_not_applied() {
        let api = Arc::new(FakeApi::default());
        *api.sessions.lock().unwrap() = vec![
            session(1, "one", SessionStatus::Created),
            session(2, "two", SessionStatus::Created),
        ];
        let ctl = controller(&api);
        ctl.load_sessions().await.unwrap();
        let before = ctl.snapshot().await;

        *api.process_reply.lock().unwrap() = Some(SessionPatch {
            status: Some(SessionStatus::Ready),
            ..SessionPatch::new(2)
        });
        let result = ctl.process_session(1).await.unwrap();

        assert_eq!(result.as_ref(), before.session(1));
        assert_eq!(ctl.snapshot().await.sessions, before.sessions);
    }

    #[tokio::test]
    async fn reloading_never_regresses_status() {
        let api = Arc::new(FakeApi::default());
        *api.sessions.lock().unwrap() = vec![session(1, "one", SessionStatus::Created)];
        let ctl = controller(&api);
        ctl.load_sessions().await.unwrap();

        *api.process_reply.lock().unwrap() = Some(SessionPatch {
            status: Some(SessionStatus::Ready),
            script_text: Some(Some("done".to_string())),
            ..SessionPatch::new(1)
        });
        ctl.process_session(1).await.unwrap();

        // A stale listing still says PROCESSING.
        *api.sessions.lock().unwrap() = vec![session(1, "one", SessionStatus::Processing)];
        ctl.load_sessions().await.unwrap();
        let reloaded = ctl.session(1).await.unwrap();
        assert_eq!(reloaded.status, SessionStatus::Ready);
        assert_eq!(reloaded.script_text.as_deref(), Some("done"));

        // Processing a READY session again is idempotent.
        *api.process_reply.lock().unwrap() = Some(SessionPatch {
            status: Some(SessionStatus::Processing),
            ..SessionPatch::new(1)
        });
        let again = ctl.process_session(1).await.unwrap().unwrap();
        assert_eq!(again.status, SessionStatus::Ready);
    }

    #[tokio::test]
    async fn superseded_process_response_is_dropped() {
        let api = Arc::new(FakeApi::default());
        *api.sessions.lock().unwrap() = vec![session(1, "one", SessionStatus::Created)];
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        api.process_gates
            .lock()
            .unwrap()
            .extend([first_rx, second_rx]);

        let ctl = Arc::new(controller(&api));
        ctl.load_sessions().await.unwrap();

        let first = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.process_session(1).await }
        });
        tokio::task::yield_now().await;
        assert!(ctl.is_pending(Operation::ProcessSession, Some(1)).await);

        let second = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.process_session(1).await }
        });
        tokio::task::yield_now().await;

        second_tx
            .send(SessionPatch {
                status: Some(SessionStatus::Ready),
                script_text: Some(Some("newest".to_string())),
                ..SessionPatch::new(1)
            })
            .unwrap();
        // The older request's answer arrives last but must not win.
        let _ = first_tx.send(SessionPatch {
            status: Some(SessionStatus::Processing),
            script_text: Some(Some("stale".to_string())),
            ..SessionPatch::new(1)
        });

        let first = first.await.unwrap();
        let second = second.await.unwrap().unwrap().unwrap();
        assert_eq!(first, Err(PortError::Superseded(Operation::ProcessSession)));
        assert_eq!(second.script_text.as_deref(), Some("newest"));
        assert_eq!(
            ctl.session(1).await.unwrap().script_text.as_deref(),
            Some("newest")
        );
        assert_eq!(ctl.notice().await, None);
    }

    #[tokio::test]
    async fn whitespace_feedback_sends_nothing() {
        let api = Arc::new(FakeApi::default());
        api.feedback
            .lock()
            .unwrap()
            .push(feedback(3, 1, "existing", 10));
        let ctl = controller(&api);
        ctl.load_feedback(1).await.unwrap();
        let requests = api.requests();

        let err = ctl.submit_feedback(1, "  ").await.unwrap_err();

        assert!(matches!(err, PortError::Validation(_)));
        assert_eq!(api.requests(), requests);
        assert_eq!(ctl.snapshot().await.feedback_for(1).len(), 1);
        assert!(ctl.notice().await.is_some());
    }

    #[tokio::test]
    async fn confirmed_feedback_goes_first() {
        let api = Arc::new(FakeApi::default());
        api.feedback.lock().unwrap().extend([
            feedback(1, 1, "older", 10),
            feedback(2, 1, "newer", 20),
        ]);
        let ctl = controller(&api);

        let listed = ctl.load_feedback(1).await.unwrap();
        assert_eq!(listed[0].id, 2);

        let saved = ctl.submit_feedback(1, " Too fast ").await.unwrap();
        assert_eq!(saved.text, "Too fast");

        let ids: Vec<i64> = ctl
            .snapshot()
            .await
            .feedback_for(1)
            .iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![10, 2, 1]);
    }

    #[tokio::test]
    async fn failed_feedback_leaves_list_and_surfaces_error() {
        let api = Arc::new(FakeApi::default());
        api.feedback.lock().unwrap().push(feedback(1, 1, "kept", 10));
        api.fail_feedback.store(true, Ordering::SeqCst);
        let ctl = controller(&api);
        ctl.load_feedback(1).await.unwrap();

        let err = ctl.submit_feedback(1, "Too fast").await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(ctl.snapshot().await.feedback_for(1).len(), 1);
        assert_eq!(
            ctl.notice().await.as_deref(),
            Some("Failed to add feedback: HTTP 500 (Internal Server Error)")
        );
        ctl.dismiss_notice().await;
        assert_eq!(ctl.notice().await, None);
    }

    #[tokio::test]
    async fn blank_session_name_is_rejected_locally() {
        let api = Arc::new(FakeApi::default());
        let ctl = controller(&api);

        let err = ctl.create_session("   ").await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        assert_eq!(api.requests(), 0);
    }

    #[tokio::test]
    async fn open_session_loads_feedback_and_events() {
        let api = Arc::new(FakeApi::default());
        *api.sessions.lock().unwrap() = vec![session(1, "one", SessionStatus::Ready)];
        api.feedback.lock().unwrap().push(feedback(1, 1, "nice", 10));
        api.events.lock().unwrap().push(ExtensionEvent {
            id: 7,
            session_id: 1,
            url: "https://app.example/settings".to_string(),
            steps: vec![Step(serde_json::json!({"message": "Opened settings"}))],
            created_at: ts(5),
            updated_at: None,
        });
        let ctl = controller(&api);

        let detail = ctl.open_session(1).await.unwrap();
        assert_eq!(detail.session.name, "one");
        assert_eq!(detail.feedback.len(), 1);
        assert_eq!(detail.events[0].steps[0].label(), "Opened settings");

        let missing = ctl.open_session(42).await.unwrap_err();
        assert_eq!(missing, PortError::SessionNotFound(42));
    }

    #[tokio::test]
    async fn failed_detail_load_leaves_nothing_pending() {
        let api = Arc::new(FakeApi::default());
        *api.sessions.lock().unwrap() = vec![session(1, "one", SessionStatus::Ready)];
        api.fail_feedback_listing.store(true, Ordering::SeqCst);
        api.hang_events.store(true, Ordering::SeqCst);
        let ctl = controller(&api);

        let err = ctl.open_session(1).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to list feedback: HTTP 500 (x)");
        assert!(!ctl.is_pending(Operation::ListFeedback, Some(1)).await);
        assert!(!ctl.is_pending(Operation::ListExtensionEvents, Some(1)).await);
    }

    #[tokio::test]
    async fn abandoned_request_is_not_pending() {
        let api = Arc::new(FakeApi::default());
        api.hang_events.store(true, Ordering::SeqCst);
        let ctl = controller(&api);

        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            ctl.load_extension_events(1),
        )
        .await;

        assert!(waited.is_err());
        assert!(!ctl.is_pending(Operation::ListExtensionEvents, Some(1)).await);
    }
}

//! Session bootstrap: the process-wide source of truth for "who is logged
//! in", and the only mutation entry points for credentials.
//!
//! [`AuthManager`] subscribes to the backend's session-change stream
//! *before* issuing the one-time existing-session fetch, so no transition in
//! between is lost. Reconciliation never runs inline in the change listener:
//! the listener enqueues the user on an mpsc queue drained by a dedicated
//! worker task, so the identity client's dispatch path is never re-entered.

pub mod pending;
pub mod reconciler;
pub mod validate;

use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::{
    AuthChange, Backend, BackendError, NewProfile, Profile, Role, Session, User,
};
use crate::events::EventBroadcaster;

use pending::{PendingSignupCache, PendingSignupProfile};

/// Errors surfaced from user-initiated auth operations.
///
/// Passive reconciliation never returns these — it logs and leaves the
/// profile absent, relying on the next session change to self-heal.
#[derive(Debug, thiserror::Error)]
pub enum AuthFlowError {
    #[error("{0}")]
    Validation(String),
    #[error("authentication failed: {0}")]
    Auth(#[source] BackendError),
    #[error("profile lookup failed: {0}")]
    ProfileFetch(#[source] BackendError),
    #[error("profile creation failed: {0}")]
    ProfileInsert(#[source] BackendError),
    #[error("role assignment failed: {0}")]
    RoleInsert(#[source] BackendError),
}

/// Observable bootstrap state. `loading` stays true until the one-time
/// existing-session fetch (and its profile fetch, when a user exists) has
/// resolved; the route guard blocks on it.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            session: None,
            user: None,
            profile: None,
            loading: true,
        }
    }
}

struct Inner {
    backend: Arc<dyn Backend>,
    pending: PendingSignupCache,
    broadcaster: Arc<EventBroadcaster>,
    site_url: String,
    state: RwLock<AuthState>,
    /// Handoff queue to the reconcile worker. None until `start` has run.
    reconcile_tx: Mutex<Option<mpsc::UnboundedSender<User>>>,
}

impl Inner {
    fn enqueue_reconcile(&self, user: User) {
        if let Ok(guard) = self.reconcile_tx.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(user);
            }
        }
    }

    /// Publish a redacted state summary — never token material.
    async fn publish_state(&self) {
        let state = self.state.read().await;
        self.broadcaster.broadcast(
            "auth.stateChanged",
            json!({
                "loading": state.loading,
                "userId": state.user.as_ref().map(|u| u.id.clone()),
                "email": state.user.as_ref().and_then(|u| u.email.clone()),
                "role": state.profile.as_ref().map(|p| p.role.to_string()),
            }),
        );
    }
}

pub struct AuthManager {
    inner: Arc<Inner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AuthManager {
    pub fn new(
        backend: Arc<dyn Backend>,
        pending: PendingSignupCache,
        broadcaster: Arc<EventBroadcaster>,
        site_url: String,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                pending,
                broadcaster,
                site_url,
                state: RwLock::new(AuthState::default()),
                reconcile_tx: Mutex::new(None),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Attach the session-change listener, then seed state from any
    /// pre-existing session and flip `loading` off.
    ///
    /// Ordering matters: the listener must be in place before the one-time
    /// fetch is issued so a change firing in between is observed. When both
    /// paths resolve, the event-driven path is authoritative for steady
    /// state; the fetch only seeds.
    pub async fn start(&self) {
        let (reconcile_tx, reconcile_rx) = mpsc::unbounded_channel();
        *self
            .inner
            .reconcile_tx
            .lock()
            .expect("reconcile queue poisoned") = Some(reconcile_tx);

        let changes = self.inner.backend.subscribe();
        {
            let mut tasks = self.tasks.lock().expect("auth task registry poisoned");
            tasks.push(tokio::spawn(listen(Arc::clone(&self.inner), changes)));
            tasks.push(tokio::spawn(reconcile_worker(
                Arc::clone(&self.inner),
                reconcile_rx,
            )));
        }

        let seeded_user = match self.inner.backend.current_session().await {
            Ok(Some(session)) => {
                let user = session.user.clone();
                let mut state = self.inner.state.write().await;
                state.session = Some(session);
                state.user = Some(user.clone());
                Some(user)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("existing-session fetch failed: {e} — starting signed out");
                None
            }
        };

        // Seed path does a plain profile fetch; lazy creation belongs to the
        // event-driven reconciler.
        if let Some(user) = seeded_user {
            let profile = match self.inner.backend.fetch_profile(&user.id).await {
                Ok(profile) => profile,
                Err(e) => {
                    warn!(user_id = %user.id, "seed profile fetch failed: {e}");
                    None
                }
            };
            self.inner.state.write().await.profile = profile;
        }

        self.inner.state.write().await.loading = false;
        self.inner.publish_state().await;
        info!("auth bootstrap complete");
    }

    /// Abort the listener and worker tasks. After this the manager no longer
    /// observes session changes.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().expect("auth task registry poisoned").drain(..) {
            task.abort();
        }
    }

    pub async fn snapshot(&self) -> AuthState {
        self.inner.state.read().await.clone()
    }

    // ─── Mutation entry points ───────────────────────────────────────────────

    /// Register a new account.
    ///
    /// The pending-signup slot is saved unconditionally on account creation —
    /// even when the immediate insert below is attempted — so the deferred
    /// reconciliation path has data on first real login if anything here
    /// fails. On auto-confirm deployments (a session already belongs to the
    /// just-created user) the profile is created immediately; a failure of
    /// that insert is returned to the caller and the slot is kept for retry.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: Role,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<(), AuthFlowError> {
        validate::email(email)?;
        validate::password(password)?;

        let outcome = self
            .inner
            .backend
            .create_account(email, password, &self.inner.site_url)
            .await
            .map_err(AuthFlowError::Auth)?;

        let pending = PendingSignupProfile {
            email: email.to_string(),
            role,
            first_name: none_if_empty(first_name),
            last_name: none_if_empty(last_name),
        };
        self.inner.pending.save(&pending).await;

        let current = self.inner.backend.current_session().await.ok().flatten();
        if let Some(session) = current {
            if session.user.id == outcome.user.id {
                let new_profile = NewProfile {
                    user_id: outcome.user.id.clone(),
                    role,
                    first_name: pending.first_name.clone(),
                    last_name: pending.last_name.clone(),
                    email: Some(pending.email.clone()),
                };
                self.inner
                    .backend
                    .insert_profile(&new_profile)
                    .await
                    .map_err(AuthFlowError::ProfileInsert)?;

                if let Err(e) = self.inner.backend.insert_user_role(&outcome.user.id, role).await {
                    warn!(
                        user_id = %outcome.user.id,
                        error = %AuthFlowError::RoleInsert(e),
                        "role assignment failed during sign-up"
                    );
                }
                self.inner.pending.clear().await;
                // The change event raced this insert; queue one more pass so
                // whichever side finished last, the adopted profile is the
                // freshly inserted row.
                self.inner.enqueue_reconcile(outcome.user.clone());
            }
        }
        Ok(())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthFlowError> {
        validate::email(email)?;
        validate::password(password)?;
        self.inner
            .backend
            .sign_in(email, password)
            .await
            .map_err(AuthFlowError::Auth)?;
        Ok(())
    }

    /// Sign out and clear the local profile immediately — the `SignedOut`
    /// event clears it again, but callers observe the cleared state as soon
    /// as this returns.
    pub async fn sign_out(&self) {
        if let Err(e) = self.inner.backend.sign_out().await {
            warn!("sign-out failed: {e}");
        }
        self.inner.state.write().await.profile = None;
        self.inner.publish_state().await;
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthFlowError> {
        validate::email(email)?;
        let redirect = format!("{}/reset-password", self.inner.site_url.trim_end_matches('/'));
        self.inner
            .backend
            .request_password_reset(email, &redirect)
            .await
            .map_err(AuthFlowError::Auth)
    }

    pub async fn update_password(&self, new_password: &str) -> Result<(), AuthFlowError> {
        validate::password(new_password)?;
        self.inner
            .backend
            .update_password(new_password)
            .await
            .map_err(AuthFlowError::Auth)
    }
}

impl Drop for AuthManager {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

// ─── Background tasks ────────────────────────────────────────────────────────

async fn listen(inner: Arc<Inner>, mut changes: broadcast::Receiver<AuthChange>) {
    loop {
        match changes.recv().await {
            Ok(change) => apply_change(&inner, change).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // The next event carries the full session, so lagging only
                // costs intermediate transitions.
                warn!(skipped, "session-change stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn apply_change(inner: &Arc<Inner>, change: AuthChange) {
    let user = change.session.as_ref().map(|s| s.user.clone());
    {
        let mut state = inner.state.write().await;
        state.session = change.session;
        state.user = user.clone();
        if user.is_none() {
            state.profile = None;
        }
    }
    inner.publish_state().await;

    // Hand reconciliation to the worker — never run it inline here.
    if let Some(user) = user {
        inner.enqueue_reconcile(user);
    }
}

async fn reconcile_worker(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<User>) {
    while let Some(user) = rx.recv().await {
        let profile =
            reconciler::reconcile(inner.backend.as_ref(), &inner.pending, &user).await;

        // A sign-out (or user switch) while reconciliation was in flight
        // must not resurrect a stale profile.
        {
            let mut state = inner.state.write().await;
            if state.user.as_ref().map(|u| u.id.as_str()) != Some(user.id.as_str()) {
                continue;
            }
            state.profile = profile;
        }
        inner.publish_state().await;
    }
}

fn none_if_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

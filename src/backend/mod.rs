//! Hosted identity/data service boundary.
//!
//! The engine talks to one external collaborator: a managed backend that
//! owns accounts, sessions, and the row store (`profiles`, `user_roles`,
//! `applications`, `assessments`). Everything the engine needs from it is
//! expressed as the [`Backend`] trait so the auth flow and the workflow
//! services can be driven against an in-memory double in tests.
//!
//! [`hosted::HostedBackend`] is the production implementation (HTTPS,
//! bearer-token row authorization).

pub mod hosted;
pub mod models;

use async_trait::async_trait;
use tokio::sync::broadcast;

pub use models::{
    Application, ApplicationStatus, Assessment, AssessmentStatus, AuthChange, AuthEvent,
    NewApplication, NewAssessment, NewProfile, Profile, Role, Session, SignUpOutcome, User,
};

/// Errors crossing the backend boundary.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The identity service rejected a credentials-bearing operation.
    #[error("auth request rejected ({status}): {message}")]
    Auth { status: u16, message: String },
    /// Transport-level failure (DNS, TLS, connect, timeout).
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status from a row operation.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body did not match the expected shape.
    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The full surface the engine consumes from the hosted service.
///
/// Row operations run under the backend's row-level authorization: the
/// implementation attaches the current session's bearer token, and the
/// backend decides what each user may read or write. The client never
/// assumes a write will succeed before a session exists.
#[async_trait]
pub trait Backend: Send + Sync {
    // ─── Identity ────────────────────────────────────────────────────────────

    /// Register a new account. `redirect_url` is where the verification email
    /// lands the user. Auto-confirm deployments return a session immediately.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        redirect_url: &str,
    ) -> Result<SignUpOutcome, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// One-time fetch of any pre-existing session.
    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    /// Session-change notifications. Subscribers must be attached before the
    /// first `current_session` call so no transition in between is lost.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), BackendError>;

    /// Update the password of the currently authenticated user.
    async fn update_password(&self, new_password: &str) -> Result<(), BackendError>;

    // ─── Profiles ────────────────────────────────────────────────────────────

    /// Fetch the profile row for a user. A missing row is `Ok(None)`, not an
    /// error.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError>;

    async fn insert_profile(&self, profile: &NewProfile) -> Result<(), BackendError>;

    /// Insert the companion role-assignment row. Best-effort from the
    /// caller's perspective; `Profile.role` stays authoritative.
    async fn insert_user_role(&self, user_id: &str, role: Role) -> Result<(), BackendError>;

    // ─── Applications ────────────────────────────────────────────────────────

    async fn insert_application(
        &self,
        application: &NewApplication,
    ) -> Result<Application, BackendError>;

    /// Applications belonging to a borrower profile, newest first.
    async fn list_applications_for_borrower(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Application>, BackendError>;

    /// All applications still awaiting review, newest first.
    async fn list_pending_applications(&self) -> Result<Vec<Application>, BackendError>;

    async fn get_application(&self, id: &str) -> Result<Option<Application>, BackendError>;

    async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<(), BackendError>;

    // ─── Assessments ─────────────────────────────────────────────────────────

    async fn insert_assessment(&self, assessment: &NewAssessment) -> Result<(), BackendError>;

    async fn list_assessments_for_lender(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Assessment>, BackendError>;

    /// Assessments for a set of application ids (borrower dashboard join).
    async fn list_assessments_for_applications(
        &self,
        application_ids: &[String],
    ) -> Result<Vec<Assessment>, BackendError>;
}

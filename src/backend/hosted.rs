//! Production [`Backend`] implementation over the hosted service's HTTPS
//! surface.
//!
//! Identity operations go to `{base}/auth/v1/*`; row operations go to
//! `{base}/rest/v1/{table}` with filter/order query parameters. Every request
//! carries the project api key; row requests additionally carry the current
//! session's bearer token so the backend's row-level authorization applies.
//!
//! The client keeps the active session in memory and mirrors it into the
//! local store, so a restarted process can pick up a still-valid session via
//! `current_session` without re-prompting for credentials. Refresh and
//! revocation stay entirely service-owned — an expired mirror is simply
//! treated as signed out.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::storage::Storage;

use super::models::{
    Application, ApplicationStatus, Assessment, AuthChange, AuthEvent, NewApplication,
    NewAssessment, NewProfile, Profile, Role, Session, SignUpOutcome, User,
};
use super::{Backend, BackendError};

/// Local-store key mirroring the active session.
const SESSION_KEY: &str = "auth.session";

/// Request timeout for every backend call.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub struct HostedBackend {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    storage: Arc<Storage>,
    session: RwLock<Option<Session>>,
    changes: broadcast::Sender<AuthChange>,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

impl HostedBackend {
    pub fn new(base_url: &str, api_key: &str, storage: Arc<Storage>) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let (changes, _) = broadcast::channel(64);
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            storage,
            session: RwLock::new(None),
            changes,
        })
    }

    // ─── Session bookkeeping ─────────────────────────────────────────────────

    /// Adopt a session, mirror it locally, and notify subscribers.
    async fn adopt_session(&self, session: Session, event: AuthEvent) {
        if let Ok(payload) = serde_json::to_string(&session) {
            if let Err(e) = self.storage.set_setting(SESSION_KEY, &payload).await {
                warn!("failed to mirror session locally: {e:#}");
            }
        }
        *self.session.write().await = Some(session.clone());
        let _ = self.changes.send(AuthChange {
            event,
            session: Some(session),
        });
    }

    async fn drop_session(&self) {
        if let Err(e) = self.storage.delete_setting(SESSION_KEY).await {
            warn!("failed to remove mirrored session: {e:#}");
        }
        *self.session.write().await = None;
        let _ = self.changes.send(AuthChange {
            event: AuthEvent::SignedOut,
            session: None,
        });
    }

    async fn bearer_token(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(s) => s.access_token.clone(),
            None => self.api_key.clone(),
        }
    }

    /// Consume a password-recovery link fragment
    /// (`access_token=…&type=recovery&…`). Resolves the embedded token to a
    /// user, adopts the recovery session, and fires `PasswordRecovery` so the
    /// bootstrapper picks it up like any other transition.
    pub async fn consume_recovery_fragment(&self, fragment: &str) -> Result<(), BackendError> {
        let mut access_token = None;
        let mut refresh_token = None;
        let mut kind = None;
        for pair in fragment.trim_start_matches('#').split('&') {
            match pair.split_once('=') {
                Some(("access_token", v)) => access_token = Some(v.to_string()),
                Some(("refresh_token", v)) => refresh_token = Some(v.to_string()),
                Some(("type", v)) => kind = Some(v.to_string()),
                _ => {}
            }
        }
        if kind.as_deref() != Some("recovery") {
            return Err(BackendError::Auth {
                status: 400,
                message: "not a recovery link".to_string(),
            });
        }
        let access_token = access_token.ok_or_else(|| BackendError::Auth {
            status: 400,
            message: "recovery link missing access token".to_string(),
        })?;

        let user: User = self
            .auth_json(
                self.client
                    .get(format!("{}/auth/v1/user", self.base_url))
                    .bearer_auth(&access_token),
            )
            .await?;

        let session = Session {
            access_token,
            refresh_token: refresh_token.unwrap_or_default(),
            expires_at: None,
            user,
        };
        self.adopt_session(session, AuthEvent::PasswordRecovery).await;
        Ok(())
    }

    // ─── Request helpers ─────────────────────────────────────────────────────

    fn auth_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("apikey", &self.api_key)
    }

    /// Send an identity request and decode the success body. Rejections come
    /// back as `BackendError::Auth` with the service's message.
    async fn auth_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let resp = self.auth_request(builder).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(auth_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn auth_empty(&self, builder: reqwest::RequestBuilder) -> Result<(), BackendError> {
        let resp = self.auth_request(builder).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(auth_error(status.as_u16(), &body));
        }
        Ok(())
    }

    fn table_url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/rest/v1/{table}", self.base_url)
        } else {
            format!("{}/rest/v1/{table}?{query}", self.base_url)
        }
    }

    async fn rows<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, BackendError> {
        let token = self.bearer_token().await;
        let resp = self
            .auth_request(self.client.get(self.table_url(table, query)))
            .bearer_auth(token)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn insert_row<B: serde::Serialize>(
        &self,
        table: &str,
        body: &B,
        want_row_back: bool,
    ) -> Result<String, BackendError> {
        let token = self.bearer_token().await;
        let prefer = if want_row_back {
            "return=representation"
        } else {
            "return=minimal"
        };
        let resp = self
            .auth_request(self.client.post(self.table_url(table, "")))
            .bearer_auth(token)
            .header("Prefer", prefer)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        debug!(table, "row inserted");
        Ok(text)
    }
}

fn auth_error(status: u16, body: &str) -> BackendError {
    // The service reports failures as {"error_description": "…"} or {"msg": "…"}.
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(String::from))
        })
        .unwrap_or_else(|| body.to_string());
    BackendError::Auth { status, message }
}

#[async_trait]
impl Backend for HostedBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        redirect_url: &str,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = format!(
            "{}/auth/v1/signup?redirect_to={redirect_url}",
            self.base_url
        );
        let value: serde_json::Value = self
            .auth_json(
                self.client
                    .post(&url)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;

        // Auto-confirm deployments answer with a full token grant; otherwise
        // the body is the bare user record awaiting email verification.
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)?;
            let session = token.into_session();
            let user = session.user.clone();
            self.adopt_session(session.clone(), AuthEvent::SignedIn).await;
            Ok(SignUpOutcome {
                user,
                session: Some(session),
            })
        } else {
            let user: User = serde_json::from_value(value)?;
            Ok(SignUpOutcome {
                user,
                session: None,
            })
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let token: TokenResponse = self
            .auth_json(
                self.client
                    .post(&url)
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        let session = token.into_session();
        self.adopt_session(session.clone(), AuthEvent::SignedIn).await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let token = self.bearer_token().await;
        let url = format!("{}/auth/v1/logout", self.base_url);
        // Revocation failure is the service's concern; locally we always end
        // up signed out.
        if let Err(e) = self.auth_empty(self.client.post(&url).bearer_auth(token)).await {
            warn!("remote sign-out failed: {e}");
        }
        self.drop_session().await;
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(Some(session.clone()));
        }
        // Fall back to the locally mirrored session from a previous run.
        let Ok(Some(raw)) = self.storage.get_setting(SESSION_KEY).await else {
            return Ok(None);
        };
        let Ok(session) = serde_json::from_str::<Session>(&raw) else {
            // Malformed mirror — discard rather than fail the bootstrap.
            let _ = self.storage.delete_setting(SESSION_KEY).await;
            return Ok(None);
        };
        if let Some(expires_at) = session.expires_at {
            if expires_at <= Utc::now().timestamp() {
                debug!("mirrored session expired — treating as signed out");
                let _ = self.storage.delete_setting(SESSION_KEY).await;
                return Ok(None);
            }
        }
        *self.session.write().await = Some(session.clone());
        Ok(Some(session))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_url: &str,
    ) -> Result<(), BackendError> {
        let url = format!(
            "{}/auth/v1/recover?redirect_to={redirect_url}",
            self.base_url
        );
        self.auth_empty(self.client.post(&url).json(&json!({ "email": email })))
            .await
    }

    async fn update_password(&self, new_password: &str) -> Result<(), BackendError> {
        let token = self.bearer_token().await;
        let url = format!("{}/auth/v1/user", self.base_url);
        self.auth_empty(
            self.client
                .put(&url)
                .bearer_auth(token)
                .json(&json!({ "password": new_password })),
        )
        .await
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let rows: Vec<Profile> = self
            .rows("profiles", &format!("user_id=eq.{user_id}&select=*"))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<(), BackendError> {
        self.insert_row("profiles", profile, false).await?;
        Ok(())
    }

    async fn insert_user_role(&self, user_id: &str, role: Role) -> Result<(), BackendError> {
        self.insert_row(
            "user_roles",
            &json!({ "user_id": user_id, "role": role }),
            false,
        )
        .await?;
        Ok(())
    }

    async fn insert_application(
        &self,
        application: &NewApplication,
    ) -> Result<Application, BackendError> {
        let body = self.insert_row("applications", application, true).await?;
        let rows: Vec<Application> = serde_json::from_str(&body)?;
        rows.into_iter().next().ok_or(BackendError::Status {
            status: 200,
            body: "insert returned no representation".to_string(),
        })
    }

    async fn list_applications_for_borrower(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Application>, BackendError> {
        self.rows(
            "applications",
            &format!("borrower_id=eq.{profile_id}&select=*&order=created_at.desc"),
        )
        .await
    }

    async fn list_pending_applications(&self) -> Result<Vec<Application>, BackendError> {
        self.rows(
            "applications",
            "status=eq.pending&select=*&order=created_at.desc",
        )
        .await
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>, BackendError> {
        let rows: Vec<Application> = self
            .rows("applications", &format!("id=eq.{id}&select=*"))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<(), BackendError> {
        let token = self.bearer_token().await;
        let url = self.table_url("applications", &format!("id=eq.{id}"));
        let resp = self
            .auth_request(self.client.patch(&url))
            .bearer_auth(token)
            .json(&json!({ "status": status }))
            .send()
            .await?;
        let http_status = resp.status();
        if !http_status.is_success() {
            return Err(BackendError::Status {
                status: http_status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn insert_assessment(&self, assessment: &NewAssessment) -> Result<(), BackendError> {
        self.insert_row("assessments", assessment, false).await?;
        Ok(())
    }

    async fn list_assessments_for_lender(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Assessment>, BackendError> {
        self.rows(
            "assessments",
            &format!("lender_id=eq.{profile_id}&select=*&order=created_at.desc"),
        )
        .await
    }

    async fn list_assessments_for_applications(
        &self,
        application_ids: &[String],
    ) -> Result<Vec<Assessment>, BackendError> {
        if application_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = application_ids.join(",");
        self.rows(
            "assessments",
            &format!("application_id=in.({ids})&select=*"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_prefers_service_message() {
        let err = auth_error(400, r#"{"error_description":"Invalid login credentials"}"#);
        match err {
            BackendError::Auth { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn auth_error_falls_back_to_raw_body() {
        let err = auth_error(502, "bad gateway");
        match err {
            BackendError::Auth { message, .. } => assert_eq!(message, "bad gateway"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn recovery_fragment_requires_recovery_type_and_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = Arc::new(crate::storage::Storage::new(dir.path()).await.unwrap());
        let backend = HostedBackend::new("https://api.test", "anon", storage).unwrap();

        // Wrong link type is rejected before any request is made.
        let err = backend
            .consume_recovery_fragment("#access_token=abc&type=signup")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Auth { status: 400, .. }));

        let err = backend
            .consume_recovery_fragment("#type=recovery")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Auth { status: 400, .. }));
    }

    #[test]
    fn token_response_computes_expiry_from_expires_in() {
        let token = TokenResponse {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: None,
            expires_in: Some(3600),
            user: User {
                id: "u1".to_string(),
                email: Some("a@b.com".to_string()),
            },
        };
        let session = token.into_session();
        let expires_at = session.expires_at.expect("expiry");
        assert!(expires_at > Utc::now().timestamp());
    }
}

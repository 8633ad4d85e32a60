//! Shared test double for the hosted backend, plus a small polling helper
//! for asserting on the event-driven auth flow.

use async_trait::async_trait;
use chrono::Utc;
use clarifin::backend::{
    Application, ApplicationStatus, Assessment, AuthChange, AuthEvent, Backend, BackendError,
    NewApplication, NewAssessment, NewProfile, Profile, Role, Session, SignUpOutcome, User,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// In-memory stand-in for the hosted identity/data service. Rows live in
/// vectors, sessions are fabricated locally, and failure injection flags let
/// tests exercise the degraded paths.
pub struct MockBackend {
    state: Mutex<MockState>,
    changes: broadcast::Sender<AuthChange>,
}

#[derive(Default)]
struct MockState {
    // email (lowercase) → (password, user)
    accounts: HashMap<String, (String, User)>,
    session: Option<Session>,
    auto_confirm: bool,
    profiles: Vec<Profile>,
    user_roles: Vec<(String, Role)>,
    applications: Vec<Application>,
    assessments: Vec<Assessment>,
    fail_profile_fetch: bool,
    fail_profile_insert: bool,
    fail_role_insert: bool,
    fail_status_update: bool,
    create_account_calls: usize,
    next_id: u64,
}

impl MockState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

fn injected(kind: &str) -> BackendError {
    BackendError::Status {
        status: 500,
        body: format!("injected {kind} failure"),
    }
}

impl MockBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(MockState::default()),
            changes,
        }
    }

    // ─── Test controls ───────────────────────────────────────────────────────

    pub fn set_auto_confirm(&self, on: bool) {
        self.state.lock().unwrap().auto_confirm = on;
    }

    pub fn fail_profile_fetch(&self, on: bool) {
        self.state.lock().unwrap().fail_profile_fetch = on;
    }

    pub fn fail_profile_insert(&self, on: bool) {
        self.state.lock().unwrap().fail_profile_insert = on;
    }

    pub fn fail_role_insert(&self, on: bool) {
        self.state.lock().unwrap().fail_role_insert = on;
    }

    pub fn fail_status_update(&self, on: bool) {
        self.state.lock().unwrap().fail_status_update = on;
    }

    pub fn create_account_calls(&self) -> usize {
        self.state.lock().unwrap().create_account_calls
    }

    pub fn profile_count(&self) -> usize {
        self.state.lock().unwrap().profiles.len()
    }

    pub fn profiles_for(&self, user_id: &str) -> Vec<Profile> {
        self.state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn role_rows_for(&self, user_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .user_roles
            .iter()
            .filter(|(id, _)| id == user_id)
            .count()
    }

    pub fn application(&self, id: &str) -> Option<Application> {
        self.state
            .lock()
            .unwrap()
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    pub fn assessments_for_application(&self, application_id: &str) -> Vec<Assessment> {
        self.state
            .lock()
            .unwrap()
            .assessments
            .iter()
            .filter(|a| a.application_id == application_id)
            .cloned()
            .collect()
    }

    /// Seed a pre-existing session, as if a previous run had signed in.
    pub fn seed_session(&self, email: &str) -> User {
        let mut state = self.state.lock().unwrap();
        let user = User {
            id: state.id("user"),
            email: Some(email.to_string()),
        };
        state.session = Some(fabricate_session(&user));
        user
    }

    /// Insert a profile row directly, bypassing authorization.
    pub fn seed_profile(&self, user_id: &str, role: Role) -> Profile {
        let mut state = self.state.lock().unwrap();
        let profile = Profile {
            id: state.id("profile"),
            user_id: user_id.to_string(),
            role,
            first_name: None,
            last_name: None,
            email: None,
        };
        state.profiles.push(profile.clone());
        profile
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let _ = self.changes.send(AuthChange { event, session });
    }
}

fn fabricate_session(user: &User) -> Session {
    Session {
        access_token: format!("token-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        expires_at: None,
        user: user.clone(),
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        _redirect_url: &str,
    ) -> Result<SignUpOutcome, BackendError> {
        let (outcome, session) = {
            let mut state = self.state.lock().unwrap();
            state.create_account_calls += 1;
            let key = email.to_lowercase();
            if state.accounts.contains_key(&key) {
                return Err(BackendError::Auth {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }
            // The identity service normalizes stored addresses to lowercase,
            // regardless of how the signup form cased them.
            let user = User {
                id: state.id("user"),
                email: Some(key.clone()),
            };
            state
                .accounts
                .insert(key, (password.to_string(), user.clone()));

            let session = if state.auto_confirm {
                let session = fabricate_session(&user);
                state.session = Some(session.clone());
                Some(session)
            } else {
                None
            };
            (SignUpOutcome { user, session: session.clone() }, session)
        };
        if let Some(session) = session {
            self.emit(AuthEvent::SignedIn, Some(session));
        }
        Ok(outcome)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let session = {
            let mut state = self.state.lock().unwrap();
            let key = email.to_lowercase();
            let user = match state.accounts.get(&key) {
                Some((stored, user)) if stored == password => user.clone(),
                _ => {
                    return Err(BackendError::Auth {
                        status: 400,
                        message: "Invalid login credentials".to_string(),
                    })
                }
            };
            let session = fabricate_session(&user);
            state.session = Some(session.clone());
            session
        };
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.state.lock().unwrap().session = None;
        self.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.state.lock().unwrap().session.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }

    async fn request_password_reset(
        &self,
        _email: &str,
        _redirect_url: &str,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    async fn update_password(&self, _new_password: &str) -> Result<(), BackendError> {
        if self.state.lock().unwrap().session.is_some() {
            Ok(())
        } else {
            Err(BackendError::Auth {
                status: 401,
                message: "not authenticated".to_string(),
            })
        }
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let state = self.state.lock().unwrap();
        if state.fail_profile_fetch {
            return Err(injected("profile fetch"));
        }
        Ok(state
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_profile_insert {
            return Err(injected("profile insert"));
        }
        if state.profiles.iter().any(|p| p.user_id == profile.user_id) {
            return Err(BackendError::Status {
                status: 409,
                body: "duplicate profile".to_string(),
            });
        }
        let id = state.id("profile");
        state.profiles.push(Profile {
            id,
            user_id: profile.user_id.clone(),
            role: profile.role,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            email: profile.email.clone(),
        });
        Ok(())
    }

    async fn insert_user_role(&self, user_id: &str, role: Role) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_role_insert {
            return Err(injected("role insert"));
        }
        state.user_roles.push((user_id.to_string(), role));
        Ok(())
    }

    async fn insert_application(
        &self,
        application: &NewApplication,
    ) -> Result<Application, BackendError> {
        let mut state = self.state.lock().unwrap();
        let id = state.id("app");
        let row = Application {
            id,
            borrower_id: application.borrower_id.clone(),
            company_name: application.company_name.clone(),
            applicant_name: application.applicant_name.clone(),
            applicant_age: application.applicant_age,
            applicant_email: application.applicant_email.clone(),
            applicant_phone: application.applicant_phone.clone(),
            employment_type: application.employment_type.clone(),
            sector: application.sector.clone(),
            annual_income: application.annual_income,
            years_employed: application.years_employed,
            loan_amount: application.loan_amount,
            loan_purpose: application.loan_purpose.clone(),
            interest_rate: application.interest_rate,
            loan_term: application.loan_term,
            credit_history_length: application.credit_history_length,
            existing_loans: application.existing_loans,
            status: ApplicationStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
        };
        state.applications.push(row.clone());
        Ok(row)
    }

    async fn list_applications_for_borrower(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Application>, BackendError> {
        let state = self.state.lock().unwrap();
        // Insertion order reversed = newest first.
        Ok(state
            .applications
            .iter()
            .filter(|a| a.borrower_id == profile_id)
            .rev()
            .cloned()
            .collect())
    }

    async fn list_pending_applications(&self) -> Result<Vec<Application>, BackendError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .applications
            .iter()
            .filter(|a| a.status == ApplicationStatus::Pending)
            .rev()
            .cloned()
            .collect())
    }

    async fn get_application(&self, id: &str) -> Result<Option<Application>, BackendError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn update_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_status_update {
            return Err(injected("status update"));
        }
        match state.applications.iter_mut().find(|a| a.id == id) {
            Some(app) => {
                app.status = status;
                Ok(())
            }
            None => Err(BackendError::Status {
                status: 404,
                body: "application not found".to_string(),
            }),
        }
    }

    async fn insert_assessment(&self, assessment: &NewAssessment) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        let id = state.id("assessment");
        let row = Assessment {
            id,
            application_id: assessment.application_id.clone(),
            lender_id: assessment.lender_id.clone(),
            risk_score: assessment.risk_score,
            risk_category: assessment.risk_category.clone(),
            status: assessment.status,
            notes: assessment.notes.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        state.assessments.push(row);
        Ok(())
    }

    async fn list_assessments_for_lender(
        &self,
        profile_id: &str,
    ) -> Result<Vec<Assessment>, BackendError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .assessments
            .iter()
            .filter(|a| a.lender_id == profile_id)
            .rev()
            .cloned()
            .collect())
    }

    async fn list_assessments_for_applications(
        &self,
        application_ids: &[String],
    ) -> Result<Vec<Assessment>, BackendError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .assessments
            .iter()
            .filter(|a| application_ids.contains(&a.application_id))
            .cloned()
            .collect())
    }
}

/// Poll an async condition until it holds, or panic after ~2s. The auth flow
/// settles through background tasks, so assertions on its results need a
/// grace window.
pub async fn eventually<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..400 {
        if condition().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for: {what}");
}

//! Row and credential types owned by the hosted backend.
//!
//! `Session` and `User` belong to the identity service; the engine only
//! observes their lifecycle. `Profile`, `Application`, and `Assessment` are
//! rows in the hosted store, scoped by row-level authorization keyed to the
//! authenticated user.

use serde::{Deserialize, Serialize};

// ─── Identity types ──────────────────────────────────────────────────────────

/// Identity-service user record. The service may omit the email (e.g. phone
/// sign-ups), so it stays optional here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

/// Token-bearing credential issued by the identity service. Issuance,
/// refresh, and revocation are entirely service-owned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds. None when the service did not report an expiry.
    pub expires_at: Option<i64>,
    pub user: User,
}

/// Outcome of account creation. `session` is present only on deployments
/// configured to auto-confirm email addresses.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

/// Session lifecycle transition observed from the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    PasswordRecovery,
}

/// One session-change notification. `session` is None exactly for
/// `SignedOut`.
#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

// ─── Roles and profiles ──────────────────────────────────────────────────────

/// Application role. `Profile.role` is the authoritative assignment; the
/// `user_roles` companion row is best-effort auxiliary data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Borrower,
    Lender,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Borrower => "borrower",
            Role::Lender => "lender",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrower" => Ok(Role::Borrower),
            "lender" => Ok(Role::Lender),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Application-owned profile row, keyed by `user_id`. Created exactly once
/// per user, and only after that user has an authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Insert payload for a new profile row.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub user_id: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

// ─── Applications ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::InReview => "in_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan application row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub borrower_id: String,
    pub company_name: String,
    pub applicant_name: Option<String>,
    pub applicant_age: Option<u32>,
    pub applicant_email: Option<String>,
    pub applicant_phone: Option<String>,
    pub employment_type: Option<String>,
    pub sector: Option<String>,
    pub annual_income: Option<f64>,
    pub years_employed: Option<u32>,
    pub loan_amount: Option<f64>,
    pub loan_purpose: Option<String>,
    pub interest_rate: Option<f64>,
    /// Term in months.
    pub loan_term: Option<u32>,
    /// Credit history length in years.
    pub credit_history_length: Option<u32>,
    pub existing_loans: Option<u32>,
    pub status: ApplicationStatus,
    pub created_at: String,
}

/// Insert payload for a new application. The backend assigns `id`,
/// `created_at`, and the initial `pending` status.
#[derive(Debug, Clone, Serialize)]
pub struct NewApplication {
    pub borrower_id: String,
    pub company_name: String,
    pub applicant_name: Option<String>,
    pub applicant_age: Option<u32>,
    pub applicant_email: Option<String>,
    pub applicant_phone: Option<String>,
    pub employment_type: Option<String>,
    pub sector: Option<String>,
    pub annual_income: Option<f64>,
    pub years_employed: Option<u32>,
    pub loan_amount: Option<f64>,
    pub loan_purpose: Option<String>,
    pub interest_rate: Option<f64>,
    pub loan_term: Option<u32>,
    pub credit_history_length: Option<u32>,
    pub existing_loans: Option<u32>,
}

// ─── Assessments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    InProgress,
    Approved,
    Rejected,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::InProgress => "in_progress",
            AssessmentStatus::Approved => "approved",
            AssessmentStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review outcome row produced by a lender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    pub application_id: String,
    pub lender_id: String,
    /// 0–100 placeholder score; None while the review is in progress.
    pub risk_score: Option<u8>,
    pub risk_category: Option<String>,
    pub status: AssessmentStatus,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Insert payload for a new assessment row.
#[derive(Debug, Clone, Serialize)]
pub struct NewAssessment {
    pub application_id: String,
    pub lender_id: String,
    pub risk_score: Option<u8>,
    pub risk_category: Option<String>,
    pub status: AssessmentStatus,
    pub notes: Option<String>,
}

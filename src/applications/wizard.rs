//! Multi-step loan application wizard.
//!
//! Four steps — personal info, employment, loan details, review — with
//! per-step required-field gating. The draft persists to the local store so
//! an interrupted application resumes where it left off.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::NewApplication;
use crate::storage::Storage;

const DRAFT_KEY: &str = "apply.draft";

pub const SECTORS: [&str; 10] = [
    "Information Technology",
    "Banking & Finance",
    "Healthcare",
    "Manufacturing",
    "Retail & E-commerce",
    "Real Estate",
    "MSME",
    "Agriculture",
    "Education",
    "Other",
];

pub const EMPLOYMENT_TYPES: [&str; 6] = [
    "Salaried - Private",
    "Salaried - Government",
    "Self-Employed",
    "Business Owner",
    "Freelancer",
    "Retired",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Personal,
    Employment,
    LoanDetails,
    Review,
}

impl WizardStep {
    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Personal => "Personal Info",
            WizardStep::Employment => "Employment",
            WizardStep::LoanDetails => "Loan Details",
            WizardStep::Review => "Review",
        }
    }

    fn next(&self) -> Option<WizardStep> {
        match self {
            WizardStep::Personal => Some(WizardStep::Employment),
            WizardStep::Employment => Some(WizardStep::LoanDetails),
            WizardStep::LoanDetails => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    fn prev(&self) -> Option<WizardStep> {
        match self {
            WizardStep::Personal => None,
            WizardStep::Employment => Some(WizardStep::Personal),
            WizardStep::LoanDetails => Some(WizardStep::Employment),
            WizardStep::Review => Some(WizardStep::LoanDetails),
        }
    }
}

/// Everything the wizard collects. Text fields stay empty strings until
/// filled; numeric fields stay None.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub applicant_name: String,
    pub applicant_age: Option<u32>,
    pub applicant_email: String,
    pub applicant_phone: String,
    pub company_name: String,
    pub employment_type: String,
    pub sector: String,
    pub annual_income: Option<f64>,
    pub years_employed: Option<u32>,
    pub loan_amount: Option<f64>,
    pub loan_purpose: String,
    pub interest_rate: Option<f64>,
    pub loan_term: Option<u32>,
    pub credit_history_length: Option<u32>,
    pub existing_loans: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationWizard {
    step: WizardStep,
    pub form: ApplicationForm,
}

impl Default for ApplicationWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Personal,
            form: ApplicationForm::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Required fields for the current step are all present.
    pub fn can_proceed(&self) -> bool {
        self.step_complete(self.step)
    }

    fn step_complete(&self, step: WizardStep) -> bool {
        let form = &self.form;
        match step {
            WizardStep::Personal => {
                !form.applicant_name.is_empty()
                    && form.applicant_age.is_some()
                    && !form.applicant_email.is_empty()
            }
            WizardStep::Employment => {
                !form.company_name.is_empty()
                    && !form.employment_type.is_empty()
                    && !form.sector.is_empty()
                    && form.annual_income.is_some()
            }
            WizardStep::LoanDetails => {
                form.loan_amount.is_some()
                    && !form.loan_purpose.is_empty()
                    && form.credit_history_length.is_some()
            }
            WizardStep::Review => true,
        }
    }

    /// Move forward if the current step's required fields are filled.
    /// Returns false when gated or already at review.
    pub fn advance(&mut self) -> bool {
        if !self.can_proceed() {
            return false;
        }
        match self.step.next() {
            Some(next) => {
                self.step = next;
                true
            }
            None => false,
        }
    }

    /// Going back is never gated.
    pub fn back(&mut self) {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
    }

    /// First step whose required fields are missing, if any.
    pub fn first_incomplete_step(&self) -> Option<WizardStep> {
        [
            WizardStep::Personal,
            WizardStep::Employment,
            WizardStep::LoanDetails,
        ]
        .into_iter()
        .find(|step| !self.step_complete(*step))
    }

    /// Build the insert payload. Fails while any required field is missing.
    pub fn build(&self, borrower_id: &str) -> Result<NewApplication> {
        if let Some(step) = self.first_incomplete_step() {
            anyhow::bail!("application incomplete: {} step is missing required fields", step.title());
        }
        let form = &self.form;
        Ok(NewApplication {
            borrower_id: borrower_id.to_string(),
            company_name: form.company_name.clone(),
            applicant_name: none_if_empty(&form.applicant_name),
            applicant_age: form.applicant_age,
            applicant_email: none_if_empty(&form.applicant_email),
            applicant_phone: none_if_empty(&form.applicant_phone),
            employment_type: none_if_empty(&form.employment_type),
            sector: none_if_empty(&form.sector),
            annual_income: form.annual_income,
            years_employed: form.years_employed,
            loan_amount: form.loan_amount,
            loan_purpose: none_if_empty(&form.loan_purpose),
            interest_rate: form.interest_rate,
            loan_term: form.loan_term,
            credit_history_length: form.credit_history_length,
            existing_loans: form.existing_loans,
        })
    }

    // ─── Draft persistence ───────────────────────────────────────────────────

    /// Persist the draft (form + step) so a reload resumes here.
    pub async fn save_draft(&self, storage: &Storage) {
        let payload = match serde_json::to_string(self) {
            Ok(p) => p,
            Err(e) => {
                warn!("failed to serialize wizard draft: {e}");
                return;
            }
        };
        if let Err(e) = storage.set_setting(DRAFT_KEY, &payload).await {
            warn!("failed to save wizard draft: {e:#}");
        }
    }

    /// Load a previously saved draft. Missing or malformed drafts read as
    /// absent.
    pub async fn load_draft(storage: &Storage) -> Option<ApplicationWizard> {
        storage
            .get_setting(DRAFT_KEY)
            .await
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    pub async fn clear_draft(storage: &Storage) {
        let _ = storage.delete_setting(DRAFT_KEY).await;
    }
}

fn none_if_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

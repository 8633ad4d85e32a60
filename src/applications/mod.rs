//! Borrower-side application workflows: wizard submission and the borrower
//! dashboard data set.

pub mod wizard;

use anyhow::{Context, Result};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::{Application, ApplicationStatus, Assessment, Backend};
use crate::events::EventBroadcaster;
use crate::storage::Storage;

use wizard::ApplicationWizard;

/// Per-status counts for the borrower dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// Borrower dashboard data: own applications (newest first) joined with any
/// assessments keyed by application id.
#[derive(Debug, Clone)]
pub struct BorrowerOverview {
    pub applications: Vec<Application>,
    pub assessments: HashMap<String, Assessment>,
    pub stats: ApplicationStats,
}

pub struct ApplicationService {
    backend: Arc<dyn Backend>,
    storage: Arc<Storage>,
    broadcaster: Arc<EventBroadcaster>,
}

impl ApplicationService {
    pub fn new(
        backend: Arc<dyn Backend>,
        storage: Arc<Storage>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            backend,
            storage,
            broadcaster,
        }
    }

    /// Submit a completed wizard as a new application and clear the local
    /// draft.
    pub async fn submit(
        &self,
        borrower_profile_id: &str,
        wizard: &ApplicationWizard,
    ) -> Result<Application> {
        let payload = wizard.build(borrower_profile_id)?;
        let application = self
            .backend
            .insert_application(&payload)
            .await
            .context("failed to submit application")?;

        ApplicationWizard::clear_draft(&self.storage).await;
        info!(id = %application.id, "application submitted");
        self.broadcaster.broadcast(
            "application.submitted",
            json!({
                "applicationId": application.id,
                "companyName": application.company_name,
            }),
        );
        Ok(application)
    }

    /// Assemble the borrower dashboard. The application list is
    /// authoritative; the assessment join is best-effort (a failure leaves
    /// the map empty rather than failing the view).
    pub async fn borrower_overview(&self, profile_id: &str) -> Result<BorrowerOverview> {
        let applications = self
            .backend
            .list_applications_for_borrower(profile_id)
            .await
            .context("failed to fetch applications")?;

        let mut assessments = HashMap::new();
        if !applications.is_empty() {
            let ids: Vec<String> = applications.iter().map(|a| a.id.clone()).collect();
            match self.backend.list_assessments_for_applications(&ids).await {
                Ok(rows) => {
                    for assessment in rows {
                        assessments.insert(assessment.application_id.clone(), assessment);
                    }
                }
                Err(e) => warn!("assessment join failed: {e}"),
            }
        }

        let stats = count_statuses(&applications);
        Ok(BorrowerOverview {
            applications,
            assessments,
            stats,
        })
    }

    pub async fn get_application(&self, id: &str) -> Result<Option<Application>> {
        self.backend
            .get_application(id)
            .await
            .context("failed to fetch application")
    }
}

fn count_statuses(applications: &[Application]) -> ApplicationStats {
    ApplicationStats {
        total: applications.len(),
        pending: applications
            .iter()
            .filter(|a| a.status == ApplicationStatus::Pending)
            .count(),
        approved: applications
            .iter()
            .filter(|a| a.status == ApplicationStatus::Approved)
            .count(),
        rejected: applications
            .iter()
            .filter(|a| a.status == ApplicationStatus::Rejected)
            .count(),
    }
}

//! Lender-side review workflows: claiming an application for review,
//! recording a decision with a placeholder risk score, and the lender
//! dashboard data set.

use anyhow::{Context, Result};
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::{
    Application, ApplicationStatus, Assessment, AssessmentStatus, Backend, NewAssessment,
};
use crate::events::EventBroadcaster;
use crate::insights::RiskCategory;

/// Lender review outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    fn assessment_status(&self) -> AssessmentStatus {
        match self {
            ReviewDecision::Approved => AssessmentStatus::Approved,
            ReviewDecision::Rejected => AssessmentStatus::Rejected,
        }
    }

    fn application_status(&self) -> ApplicationStatus {
        match self {
            ReviewDecision::Approved => ApplicationStatus::Approved,
            ReviewDecision::Rejected => ApplicationStatus::Rejected,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

/// What `decide` recorded.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub risk_score: u8,
    pub risk_category: RiskCategory,
    pub status: AssessmentStatus,
}

/// Per-status counts for the lender dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewStats {
    pub total_reviewed: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// Assessment counts bucketed by score band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Lender dashboard data: own assessments plus the queue of applications
/// awaiting review.
#[derive(Debug, Clone)]
pub struct LenderOverview {
    pub assessments: Vec<Assessment>,
    pub pending_applications: Vec<Application>,
    pub stats: ReviewStats,
    pub risk_distribution: RiskDistribution,
}

pub struct AssessmentService {
    backend: Arc<dyn Backend>,
    broadcaster: Arc<EventBroadcaster>,
}

impl AssessmentService {
    pub fn new(backend: Arc<dyn Backend>, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            backend,
            broadcaster,
        }
    }

    /// Claim an application for review by recording an in-progress
    /// assessment.
    pub async fn start_review(
        &self,
        lender_profile_id: &str,
        application_id: &str,
    ) -> Result<()> {
        self.backend
            .insert_assessment(&NewAssessment {
                application_id: application_id.to_string(),
                lender_id: lender_profile_id.to_string(),
                risk_score: None,
                risk_category: None,
                status: AssessmentStatus::InProgress,
                notes: None,
            })
            .await
            .context("failed to start assessment")?;

        self.broadcaster.broadcast(
            "assessment.started",
            json!({ "applicationId": application_id }),
        );
        Ok(())
    }

    /// Record a decision: generate a placeholder risk score in the band the
    /// decision implies, insert the assessment, then propagate the status to
    /// the application row. The status propagation is best-effort — the
    /// assessment row is already the decision of record.
    pub async fn decide(
        &self,
        lender_profile_id: &str,
        application: &Application,
        decision: ReviewDecision,
    ) -> Result<ReviewOutcome> {
        let risk_score = placeholder_score(decision);
        let risk_category = RiskCategory::from_score(risk_score);
        let status = decision.assessment_status();

        self.backend
            .insert_assessment(&NewAssessment {
                application_id: application.id.clone(),
                lender_id: lender_profile_id.to_string(),
                risk_score: Some(risk_score),
                risk_category: Some(risk_category.as_str().to_string()),
                status,
                notes: Some(format!(
                    "Application {} by lender review.",
                    decision.as_str()
                )),
            })
            .await
            .context("failed to record assessment")?;

        if let Err(e) = self
            .backend
            .update_application_status(&application.id, decision.application_status())
            .await
        {
            warn!(application_id = %application.id, "status propagation failed: {e}");
        }

        info!(
            application_id = %application.id,
            decision = decision.as_str(),
            risk_score,
            "review recorded"
        );
        self.broadcaster.broadcast(
            "assessment.decided",
            json!({
                "applicationId": application.id,
                "decision": decision.as_str(),
                "riskScore": risk_score,
            }),
        );

        Ok(ReviewOutcome {
            risk_score,
            risk_category,
            status,
        })
    }

    /// Assemble the lender dashboard. The two fetches are independent and
    /// each failure degrades to an empty list rather than failing the view.
    pub async fn lender_overview(&self, profile_id: &str) -> LenderOverview {
        let assessments = match self.backend.list_assessments_for_lender(profile_id).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to fetch assessments: {e}");
                Vec::new()
            }
        };
        let pending_applications = match self.backend.list_pending_applications().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("failed to fetch pending applications: {e}");
                Vec::new()
            }
        };

        let stats = ReviewStats {
            total_reviewed: assessments.len(),
            pending: pending_applications.len(),
            approved: assessments
                .iter()
                .filter(|a| a.status == AssessmentStatus::Approved)
                .count(),
            rejected: assessments
                .iter()
                .filter(|a| a.status == AssessmentStatus::Rejected)
                .count(),
        };
        let risk_distribution = bucket_by_score(&assessments);

        LenderOverview {
            assessments,
            pending_applications,
            stats,
            risk_distribution,
        }
    }
}

/// Score bands implied by the decision: approvals land in the low band
/// (5–37), rejections in the high band (67–100).
fn placeholder_score(decision: ReviewDecision) -> u8 {
    let mut rng = rand::thread_rng();
    match decision {
        ReviewDecision::Approved => rng.gen_range(5..=37),
        ReviewDecision::Rejected => rng.gen_range(67..=100),
    }
}

/// Unscored (in-progress) assessments count as zero, i.e. the low bucket.
fn bucket_by_score(assessments: &[Assessment]) -> RiskDistribution {
    let mut dist = RiskDistribution::default();
    for assessment in assessments {
        match assessment.risk_score.unwrap_or(0) {
            0..=33 => dist.low += 1,
            34..=66 => dist.medium += 1,
            _ => dist.high += 1,
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(score: Option<u8>, status: AssessmentStatus) -> Assessment {
        Assessment {
            id: "a1".to_string(),
            application_id: "app1".to_string(),
            lender_id: "l1".to_string(),
            risk_score: score,
            risk_category: None,
            status,
            notes: None,
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn approved_scores_stay_in_the_low_band() {
        for _ in 0..100 {
            let score = placeholder_score(ReviewDecision::Approved);
            assert!((5..=37).contains(&score), "score {score} out of band");
        }
    }

    #[test]
    fn rejected_scores_stay_in_the_high_band() {
        for _ in 0..100 {
            let score = placeholder_score(ReviewDecision::Rejected);
            assert!((67..=100).contains(&score), "score {score} out of band");
        }
    }

    #[test]
    fn distribution_buckets_match_band_edges() {
        let rows = vec![
            assessment(Some(10), AssessmentStatus::Approved),
            assessment(Some(33), AssessmentStatus::Approved),
            assessment(Some(34), AssessmentStatus::Approved),
            assessment(Some(80), AssessmentStatus::Rejected),
            assessment(None, AssessmentStatus::InProgress),
        ];
        let dist = bucket_by_score(&rows);
        assert_eq!(dist.low, 3); // 10, 33, and the unscored row
        assert_eq!(dist.medium, 1);
        assert_eq!(dist.high, 1);
    }
}

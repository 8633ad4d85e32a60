//! Placeholder risk analytics.
//!
//! Everything in this module is static mock data or a client-generated
//! value shaped like the output of a scoring pipeline. There is no model and
//! no inference — the fixtures exist so dashboards and review views have
//! realistic content to render.

// ─── Risk banding ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// Band edges: low ≤ 33 < medium ≤ 66 < high.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=33 => RiskCategory::Low,
            34..=66 => RiskCategory::Medium,
            _ => RiskCategory::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "low",
            RiskCategory::Medium => "medium",
            RiskCategory::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Medium => "Medium Risk",
            RiskCategory::High => "High Risk",
        }
    }
}

/// Placeholder decision recommendation for a risk score.
#[derive(Debug, Clone, Copy)]
pub struct Recommendation {
    pub status: &'static str,
    pub confidence: u8,
    pub message: &'static str,
}

pub fn recommendation(score: u8) -> Recommendation {
    match RiskCategory::from_score(score) {
        RiskCategory::Low => Recommendation {
            status: "Approved",
            confidence: 94,
            message: "Application meets all risk criteria. Recommend standard terms.",
        },
        RiskCategory::Medium => Recommendation {
            status: "Restricted",
            confidence: 78,
            message: "Moderate risk detected. Consider additional collateral or higher interest rate.",
        },
        RiskCategory::High => Recommendation {
            status: "Rejected",
            confidence: 89,
            message: "High default probability. Not recommended for approval at this time.",
        },
    }
}

// ─── Explainability placeholders ─────────────────────────────────────────────

/// One feature-importance entry. Negative values push the score down
/// (favorable), positive values push it up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplainabilityFactor {
    pub name: &'static str,
    pub value: f64,
    pub description: &'static str,
}

const HIGH_RISK_FACTORS: [ExplainabilityFactor; 5] = [
    ExplainabilityFactor { name: "Debt-to-Income Ratio", value: 0.45, description: "Current debt levels are elevated relative to income" },
    ExplainabilityFactor { name: "Industry Outlook", value: 0.25, description: "Sector showing declining trends" },
    ExplainabilityFactor { name: "Cash Flow Stability", value: -0.15, description: "Consistent monthly cash flows observed" },
    ExplainabilityFactor { name: "Credit History", value: 0.35, description: "Some late payments in recent history" },
    ExplainabilityFactor { name: "Business Age", value: -0.10, description: "Established business track record" },
];

const MEDIUM_RISK_FACTORS: [ExplainabilityFactor; 5] = [
    ExplainabilityFactor { name: "Revenue Growth", value: -0.20, description: "Positive revenue trend observed" },
    ExplainabilityFactor { name: "Debt-to-Income Ratio", value: 0.25, description: "Moderate debt relative to income" },
    ExplainabilityFactor { name: "Industry Outlook", value: 0.10, description: "Sector performance is stable" },
    ExplainabilityFactor { name: "Cash Flow Stability", value: -0.30, description: "Strong and consistent cash flows" },
    ExplainabilityFactor { name: "Collateral Coverage", value: -0.15, description: "Adequate collateral provided" },
];

const LOW_RISK_FACTORS: [ExplainabilityFactor; 5] = [
    ExplainabilityFactor { name: "Credit History", value: -0.40, description: "Excellent payment history" },
    ExplainabilityFactor { name: "Cash Flow Stability", value: -0.35, description: "Very strong cash flow patterns" },
    ExplainabilityFactor { name: "Debt-to-Income Ratio", value: -0.25, description: "Low debt relative to income" },
    ExplainabilityFactor { name: "Revenue Growth", value: -0.30, description: "Strong upward revenue trend" },
    ExplainabilityFactor { name: "Industry Outlook", value: -0.15, description: "Sector showing positive growth" },
];

/// Feature-importance placeholders keyed off the score band.
///
/// Bands here are the explainability view's own (high ≥ 70, medium ≥ 40),
/// intentionally different from [`RiskCategory`] edges.
pub fn explainability_factors(risk_score: u8) -> &'static [ExplainabilityFactor] {
    if risk_score >= 70 {
        &HIGH_RISK_FACTORS
    } else if risk_score >= 40 {
        &MEDIUM_RISK_FACTORS
    } else {
        &LOW_RISK_FACTORS
    }
}

/// Strongest factors first, by absolute importance.
pub fn top_factors(
    factors: &'static [ExplainabilityFactor],
    n: usize,
) -> Vec<ExplainabilityFactor> {
    let mut sorted: Vec<ExplainabilityFactor> = factors.to_vec();
    sorted.sort_by(|a, b| {
        b.value
            .abs()
            .partial_cmp(&a.value.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(n);
    sorted
}

/// Narrative justification text for a review outcome.
pub fn justification(risk_score: u8, status: &str) -> &'static str {
    match status {
        "approved" => {
            "Based on comprehensive analysis, this application demonstrates strong financial \
             fundamentals with consistent cash flows, manageable debt levels, and positive \
             industry trends. The risk assessment agents have identified favorable conditions \
             for loan approval."
        }
        "rejected" => {
            "The multi-agent analysis identified elevated risk factors including high \
             debt-to-income ratio, inconsistent cash flows, and unfavorable sector trends. \
             These factors combined exceed the acceptable risk threshold for approval."
        }
        _ => {
            if risk_score >= 70 {
                "Initial assessment indicates elevated risk factors. The application requires \
                 additional review by our risk assessment team to evaluate mitigation strategies."
            } else if risk_score >= 40 {
                "The application shows moderate risk indicators with some positive factors \
                 balancing areas of concern. Further analysis is in progress to determine final \
                 eligibility."
            } else {
                "Preliminary analysis shows favorable risk indicators. The application is being \
                 processed for final verification and approval decision."
            }
        }
    }
}

// ─── Pipeline stages ─────────────────────────────────────────────────────────

/// The presentation-level agent pipeline: apply → risk agents →
/// explainability → decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStage {
    pub label: &'static str,
    pub description: &'static str,
}

pub const PIPELINE_STAGES: [PipelineStage; 4] = [
    PipelineStage { label: "User Applies", description: "Borrower submits application" },
    PipelineStage { label: "Risk Agents", description: "AI analyzes multiple factors" },
    PipelineStage { label: "Explainability", description: "SHAP explains decisions" },
    PipelineStage { label: "Decision", description: "Clear, justified outcome" },
];

// ─── Portfolio placeholders ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorTrend {
    pub sector: &'static str,
    pub current: u8,
    pub previous: u8,
}

pub const SECTOR_RISK: [SectorTrend; 6] = [
    SectorTrend { sector: "IT", current: 32, previous: 38 },
    SectorTrend { sector: "Finance", current: 28, previous: 30 },
    SectorTrend { sector: "Retail", current: 45, previous: 42 },
    SectorTrend { sector: "MSME", current: 52, previous: 48 },
    SectorTrend { sector: "Healthcare", current: 25, previous: 28 },
    SectorTrend { sector: "Manufacturing", current: 38, previous: 40 },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub month: &'static str,
    pub rate: f64,
}

pub const DEFAULT_RATE_TREND: [TrendPoint; 7] = [
    TrendPoint { month: "Jul", rate: 3.2 },
    TrendPoint { month: "Aug", rate: 3.5 },
    TrendPoint { month: "Sep", rate: 3.8 },
    TrendPoint { month: "Oct", rate: 3.4 },
    TrendPoint { month: "Nov", rate: 3.1 },
    TrendPoint { month: "Dec", rate: 2.9 },
    TrendPoint { month: "Jan", rate: 2.7 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Info,
    Warning,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarlyWarning {
    pub severity: WarningSeverity,
    pub message: &'static str,
    pub sector: &'static str,
    pub impact: &'static str,
}

pub const EARLY_WARNINGS: [EarlyWarning; 3] = [
    EarlyWarning {
        severity: WarningSeverity::Warning,
        message: "MSME sector showing elevated stress signals",
        sector: "MSME",
        impact: "Medium",
    },
    EarlyWarning {
        severity: WarningSeverity::Alert,
        message: "Retail sector defaults up 7% MoM",
        sector: "Retail",
        impact: "High",
    },
    EarlyWarning {
        severity: WarningSeverity::Info,
        message: "IT sector risk declining consistently",
        sector: "IT",
        impact: "Positive",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_band_edges() {
        assert_eq!(RiskCategory::from_score(0), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(33), RiskCategory::Low);
        assert_eq!(RiskCategory::from_score(34), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(66), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_score(67), RiskCategory::High);
        assert_eq!(RiskCategory::from_score(100), RiskCategory::High);
    }

    #[test]
    fn recommendation_tracks_category() {
        assert_eq!(recommendation(10).status, "Approved");
        assert_eq!(recommendation(50).status, "Restricted");
        assert_eq!(recommendation(90).status, "Rejected");
    }

    #[test]
    fn explainability_bands_differ_from_category_bands() {
        // 35 is Medium as a category but still renders low-risk factors.
        assert_eq!(explainability_factors(35), &LOW_RISK_FACTORS[..]);
        assert_eq!(explainability_factors(40), &MEDIUM_RISK_FACTORS[..]);
        assert_eq!(explainability_factors(70), &HIGH_RISK_FACTORS[..]);
    }

    #[test]
    fn top_factors_orders_by_absolute_importance() {
        let top = top_factors(&LOW_RISK_FACTORS, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].name, "Credit History");
        assert!(top[0].value.abs() >= top[1].value.abs());
        assert!(top[1].value.abs() >= top[2].value.abs());
    }

    #[test]
    fn justification_prefers_final_status_over_score() {
        assert!(justification(90, "approved").contains("favorable conditions"));
        assert!(justification(10, "rejected").contains("elevated risk factors"));
        assert!(justification(10, "in_progress").contains("Preliminary analysis"));
    }
}

use crate::{config::SummaryConfig, retention::RetentionStrategy, segmentation::ClvAnalysis};
use serde::{Deserialize, Serialize};

/// Scalar executive metrics. The two projections are fixed multipliers,
/// not fitted estimates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveSummary {
    pub total_customers: usize,
    pub avg_clv: f64,
    pub high_risk_count: usize,
    pub value_at_risk: f64,
    pub strategies_generated: usize,
    /// Fraction, e.g. 0.25 for "25% improvement".
    pub projected_roi_improvement: f64,
    pub expected_churn_prevention: f64,
}

impl ExecutiveSummary {
    pub fn from_parts(
        analysis: &ClvAnalysis,
        strategies: &[RetentionStrategy],
        config: &SummaryConfig,
    ) -> Self {
        Self {
            total_customers: analysis.total_customers,
            avg_clv: analysis.avg_clv,
            high_risk_count: analysis.high_risk_count,
            value_at_risk: analysis.at_risk.total_clv,
            strategies_generated: strategies.len(),
            projected_roi_improvement: config.projected_roi_improvement,
            expected_churn_prevention: analysis.at_risk.total_clv * config.churn_prevention_rate,
        }
    }
}

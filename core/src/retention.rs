//! Rule-based retention strategy selection.
//!
//! Rules are evaluated in priority order; the first match wins:
//!   1. recency above threshold        → re-engagement email series
//!   2. support tickets above threshold → proactive success outreach
//!   3. email opens below threshold    → multi-channel communication
//!   4. otherwise                      → loyalty program enrollment

use crate::{
    config::RetentionRules,
    customer::{CustomerProfile, CustomerRecord, RiskSegment},
    types::CustomerId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RetentionAction {
    ReEngagementEmail,
    ProactiveOutreach,
    MultiChannel,
    LoyaltyProgram,
}

impl RetentionAction {
    pub fn description(&self) -> &'static str {
        match self {
            Self::ReEngagementEmail => "Re-engagement email series with personalized offers",
            Self::ProactiveOutreach => "Proactive customer success outreach",
            Self::MultiChannel => "Multi-channel communication (SMS, push notifications)",
            Self::LoyaltyProgram => "Loyalty program enrollment with exclusive benefits",
        }
    }
}

/// The engagement fields the rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementSignals {
    pub recency: f64,
    pub support_tickets: u64,
    pub email_opens: u64,
}

impl From<&CustomerRecord> for EngagementSignals {
    fn from(c: &CustomerRecord) -> Self {
        Self {
            recency: c.recency,
            support_tickets: c.support_tickets,
            email_opens: c.email_opens,
        }
    }
}

impl From<&CustomerProfile> for EngagementSignals {
    fn from(p: &CustomerProfile) -> Self {
        Self {
            recency: p.recency,
            support_tickets: p.support_tickets,
            email_opens: p.email_opens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetentionStrategy {
    pub customer_id: CustomerId,
    pub clv: f64,
    pub churn_risk: f64,
    pub action: RetentionAction,
    pub strategy: String,
}

pub fn select_action(signals: EngagementSignals, rules: &RetentionRules) -> RetentionAction {
    if signals.recency > rules.recency_days_above {
        RetentionAction::ReEngagementEmail
    } else if signals.support_tickets > rules.support_tickets_above {
        RetentionAction::ProactiveOutreach
    } else if signals.email_opens < rules.email_opens_below {
        RetentionAction::MultiChannel
    } else {
        RetentionAction::LoyaltyProgram
    }
}

/// One strategy for each of the first `limit` High-risk customers,
/// in generation order.
pub fn recommend(
    records: &[CustomerRecord],
    limit: usize,
    rules: &RetentionRules,
) -> Vec<RetentionStrategy> {
    records
        .iter()
        .filter(|c| c.risk_segment == RiskSegment::High)
        .take(limit)
        .map(|c| {
            let action = select_action(c.into(), rules);
            RetentionStrategy {
                customer_id: c.customer_id.clone(),
                clv: c.predicted_clv,
                churn_risk: c.churn_probability,
                action,
                strategy: action.description().to_string(),
            }
        })
        .collect()
}

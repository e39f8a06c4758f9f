//! Synthetic customer generation.
//!
//! Per customer, draws are consumed in a fixed order:
//!   offset, spend, frequency, recency, email opens,
//!   support tickets, app sessions, churn noise.
//! Changing this order changes every record for a given seed.

use crate::{
    config::{ClvConfig, GeneratorConfig, SegmentThresholds},
    error::{ClvError, ClvResult},
    rng::{DrawSource, RngBank, StreamSlot},
    scorer::{Scorer, ScoringInputs},
    types::{round_to, CustomerId, Days},
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskSegment {
    High,
    Medium,
    Low,
}

impl RiskSegment {
    /// Report order.
    pub const ALL: [RiskSegment; 3] = [RiskSegment::High, RiskSegment::Medium, RiskSegment::Low];

    pub fn classify(churn_probability: f64, thresholds: &SegmentThresholds) -> Self {
        if churn_probability > thresholds.high {
            Self::High
        } else if churn_probability > thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub acquisition_date: NaiveDateTime,
    pub tenure_days: Days,
    pub monthly_spend: f64,
    pub frequency: u64,
    pub recency: f64,
    pub avg_order_value: f64,
    pub email_opens: u64,
    pub support_tickets: u64,
    pub app_sessions: u64,
    /// Not clamped: extreme draws can push this slightly outside [0, 1].
    pub churn_probability: f64,
    pub predicted_clv: f64,
    pub risk_segment: RiskSegment,
}

impl CustomerRecord {
    /// Whether the churn probability is a proper probability.
    pub fn churn_in_unit_range(&self) -> bool {
        (0.0..=1.0).contains(&self.churn_probability)
    }
}

/// Behavioural profile supplied from outside the generator,
/// e.g. the churn scoring route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub tenure_days: Days,
    pub monthly_spend: f64,
    pub frequency: u64,
    pub recency: f64,
    pub email_opens: u64,
    pub support_tickets: u64,
    #[serde(default)]
    pub app_sessions: u64,
    /// Noise draw in [0, 1). Defaults to 0 (no noise).
    #[serde(default)]
    pub noise: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileScore {
    pub customer_id: CustomerId,
    pub avg_order_value: f64,
    pub churn_probability: f64,
    pub predicted_clv: f64,
    pub risk_segment: RiskSegment,
}

pub fn avg_order_value(monthly_spend: f64, frequency: u64) -> f64 {
    if frequency > 0 {
        monthly_spend / frequency as f64
    } else {
        0.0
    }
}

/// `as_of` minus `offset` whole days, or a generator error when the
/// result falls outside the representable calendar.
pub fn acquisition_date(as_of: NaiveDateTime, offset: Days) -> ClvResult<NaiveDateTime> {
    Duration::try_days(offset)
        .and_then(|d| as_of.checked_sub_signed(d))
        .ok_or_else(|| ClvError::Computation {
            stage: "generator",
            reason: format!("acquisition date {offset} days before {as_of} is out of range"),
        })
}

pub struct CustomerGenerator<'a> {
    config: &'a ClvConfig,
    scorer: &'a dyn Scorer,
    as_of: NaiveDateTime,
}

impl<'a> CustomerGenerator<'a> {
    pub fn new(config: &'a ClvConfig, scorer: &'a dyn Scorer, as_of: NaiveDateTime) -> Self {
        Self {
            config,
            scorer,
            as_of,
        }
    }

    /// Generate `count` customers from a fresh generator stream of `seed`.
    pub fn generate_seeded(&self, count: usize, seed: u64) -> ClvResult<Vec<CustomerRecord>> {
        let mut rng = RngBank::new(seed).for_stream(StreamSlot::Generator);
        self.generate(count, &mut rng)
    }

    pub fn generate<D: DrawSource>(
        &self,
        count: usize,
        draws: &mut D,
    ) -> ClvResult<Vec<CustomerRecord>> {
        let mut customers = Vec::with_capacity(count);
        for i in 0..count {
            customers.push(self.generate_one(i, draws)?);
        }
        log::debug!("generator: {} customers as of {}", customers.len(), self.as_of);
        Ok(customers)
    }

    fn generate_one<D: DrawSource>(&self, index: usize, draws: &mut D) -> ClvResult<CustomerRecord> {
        let g: &GeneratorConfig = &self.config.generator;

        let offset = draws.uniform_int(g.acquisition_offset_min_days, g.acquisition_offset_max_days);
        let monthly_spend = draws.log_normal(g.spend_log_mean, g.spend_log_sigma);
        let frequency = draws.poisson(g.frequency_lambda) + g.frequency_shift;
        let recency = draws.exponential(g.recency_scale_days);
        let email_opens = draws.binomial(g.email_trials, g.email_open_probability);
        let support_tickets = draws.poisson(g.support_ticket_lambda);
        let app_sessions = draws.poisson(g.app_session_lambda);
        let noise = draws.next_f64();

        let tenure_days = offset;
        let assessment = self.scorer.assess(&ScoringInputs {
            tenure_days,
            frequency,
            recency_days: recency,
            support_tickets,
            monthly_spend,
            noise,
        })?;

        let churn_probability = round_to(assessment.churn_score, 3);
        let acquisition_date = acquisition_date(self.as_of, offset)?;

        Ok(CustomerRecord {
            customer_id: format!("{}{:0width$}", g.id_prefix, index + 1, width = g.id_width),
            acquisition_date,
            tenure_days,
            monthly_spend: round_to(monthly_spend, 2),
            frequency,
            recency: round_to(recency, 1),
            avg_order_value: round_to(avg_order_value(monthly_spend, frequency), 2),
            email_opens,
            support_tickets,
            app_sessions,
            churn_probability,
            predicted_clv: round_to(assessment.predicted_clv, 2),
            risk_segment: RiskSegment::classify(churn_probability, &self.config.segments),
        })
    }

    /// Score a single externally supplied profile with the same
    /// rounding as generated records.
    pub fn score_profile(&self, profile: &CustomerProfile) -> ClvResult<ProfileScore> {
        let assessment = self.scorer.assess(&ScoringInputs {
            tenure_days: profile.tenure_days,
            frequency: profile.frequency,
            recency_days: profile.recency,
            support_tickets: profile.support_tickets,
            monthly_spend: profile.monthly_spend,
            noise: profile.noise,
        })?;
        let churn_probability = round_to(assessment.churn_score, 3);
        Ok(ProfileScore {
            customer_id: profile.customer_id.clone(),
            avg_order_value: round_to(avg_order_value(profile.monthly_spend, profile.frequency), 2),
            churn_probability,
            predicted_clv: round_to(assessment.predicted_clv, 2),
            risk_segment: RiskSegment::classify(churn_probability, &self.config.segments),
        })
    }
}

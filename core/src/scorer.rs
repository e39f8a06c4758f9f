//! Churn/CLV scoring capability.
//!
//! The generator, the churn route and everything downstream only see
//! `dyn Scorer`. Today the closed-form formula is the only backend that
//! produces numbers; `ModelScorer` is the slot a fitted model plugs into.
//!
//! Formula (all weights from `ChurnWeights`):
//!   churn = w_r·min(recency/90, 1)
//!         + w_t·max(0, (60 − tenure)/60)
//!         + w_f·max(0, (5 − frequency)/5)
//!         + w_s·min(tickets/3, 1)
//!         + w_n·noise
//!   lifespan = max(30, 365·(1 − churn))
//!   clv      = spend · (lifespan/30) · (1 − churn·0.5)
//!
//! The churn score is NOT clamped to [0, 1].

use crate::{
    config::{ChurnWeights, ClvConfig, ClvFormulaConfig},
    error::{ClvError, ClvResult},
    types::Days,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Formula,
    FittedModel,
}

impl ScorerKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Formula => "formula",
            Self::FittedModel => "fitted_model",
        }
    }
}

/// Unrounded behavioural inputs for one customer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringInputs {
    pub tenure_days: Days,
    pub frequency: u64,
    pub recency_days: f64,
    pub support_tickets: u64,
    pub monthly_spend: f64,
    /// Uniform [0, 1) draw for the noise term.
    pub noise: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChurnAssessment {
    pub churn_score: f64,
    pub predicted_lifespan_days: f64,
    pub predicted_clv: f64,
    // Weighted components
    pub recency_component: f64,
    pub tenure_component: f64,
    pub frequency_component: f64,
    pub support_component: f64,
    pub noise_component: f64,
}

pub trait Scorer: Send + Sync {
    fn kind(&self) -> ScorerKind;

    fn assess(&self, inputs: &ScoringInputs) -> ClvResult<ChurnAssessment>;
}

// ── Formula ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FormulaScorer {
    weights: ChurnWeights,
    clv: ClvFormulaConfig,
}

impl FormulaScorer {
    pub fn new(config: &ClvConfig) -> Self {
        Self {
            weights: config.churn_weights.clone(),
            clv: config.clv.clone(),
        }
    }
}

impl Scorer for FormulaScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Formula
    }

    fn assess(&self, inputs: &ScoringInputs) -> ClvResult<ChurnAssessment> {
        let w = &self.weights;

        let recency_component =
            w.recency_weight * (inputs.recency_days / w.recency_horizon_days).min(1.0);

        let tenure_component = w.tenure_weight
            * ((w.tenure_horizon_days - inputs.tenure_days as f64) / w.tenure_horizon_days)
                .max(0.0);

        let frequency_component = w.frequency_weight
            * ((w.frequency_target - inputs.frequency as f64) / w.frequency_target).max(0.0);

        let support_component =
            w.support_weight * (inputs.support_tickets as f64 / w.support_ticket_cap).min(1.0);

        let noise_component = w.noise_weight * inputs.noise;

        let churn_score = recency_component
            + tenure_component
            + frequency_component
            + support_component
            + noise_component;

        let predicted_lifespan_days = (self.clv.lifespan_horizon_days * (1.0 - churn_score))
            .max(self.clv.lifespan_floor_days);

        let predicted_clv = inputs.monthly_spend
            * (predicted_lifespan_days / self.clv.days_per_month)
            * (1.0 - churn_score * self.clv.churn_discount);

        if !predicted_clv.is_finite() {
            return Err(ClvError::Computation {
                stage: "scorer",
                reason: format!("non-finite CLV from spend {}", inputs.monthly_spend),
            });
        }

        Ok(ChurnAssessment {
            churn_score,
            predicted_lifespan_days,
            predicted_clv,
            recency_component,
            tenure_component,
            frequency_component,
            support_component,
            noise_component,
        })
    }
}

// ── Fitted model ───────────────────────────────────────────────────

/// Descriptor of a model artifact produced outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    pub name: String,
    pub version: String,
}

/// Placeholder for a fitted model. No training or inference lives
/// here; without an artifact every call fails with `ModelUnavailable`.
#[derive(Debug, Clone, Default)]
pub struct ModelScorer {
    artifact: Option<ModelArtifact>,
}

impl ModelScorer {
    pub fn unloaded() -> Self {
        Self { artifact: None }
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_ref()
    }

    /// Startup hook. There is no artifact store yet, so this always
    /// reports the model as unavailable.
    pub fn load() -> ClvResult<Self> {
        Err(ClvError::ModelUnavailable {
            scorer: ScorerKind::FittedModel.name().into(),
        })
    }
}

impl Scorer for ModelScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::FittedModel
    }

    fn assess(&self, _inputs: &ScoringInputs) -> ClvResult<ChurnAssessment> {
        Err(ClvError::ModelUnavailable {
            scorer: match &self.artifact {
                Some(a) => format!("{}@{}", a.name, a.version),
                None => ScorerKind::FittedModel.name().into(),
            },
        })
    }
}

/// Initialize the preferred scorer, falling back to the formula when a
/// fitted model cannot be loaded.
pub fn select_scorer(preferred: ScorerKind, config: &ClvConfig) -> Box<dyn Scorer> {
    match preferred {
        ScorerKind::Formula => Box::new(FormulaScorer::new(config)),
        ScorerKind::FittedModel => match ModelScorer::load() {
            Ok(model) => {
                log::info!("scorer: fitted model loaded");
                Box::new(model)
            }
            Err(e) => {
                log::warn!("scorer: {e}; falling back to formula");
                Box::new(FormulaScorer::new(config))
            }
        },
    }
}

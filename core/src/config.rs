use crate::{
    error::{ClvError, ClvResult},
    types::Days,
};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "clv_config.json";

// ── Generator ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    pub customer_count: usize,
    pub id_prefix: String,
    pub id_width: usize,
    /// Acquisition offset in days, drawn uniformly from [min, max).
    pub acquisition_offset_min_days: Days,
    pub acquisition_offset_max_days: Days,
    pub spend_log_mean: f64,
    pub spend_log_sigma: f64,
    pub frequency_lambda: f64,
    /// Added to the Poisson draw so frequency is never zero.
    pub frequency_shift: u64,
    pub recency_scale_days: f64,
    pub email_trials: u64,
    pub email_open_probability: f64,
    pub support_ticket_lambda: f64,
    pub app_session_lambda: f64,
}

// ── Scoring ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChurnWeights {
    pub recency_weight: f64,
    pub recency_horizon_days: f64,
    pub tenure_weight: f64,
    pub tenure_horizon_days: f64,
    pub frequency_weight: f64,
    pub frequency_target: f64,
    pub support_weight: f64,
    pub support_ticket_cap: f64,
    pub noise_weight: f64,
}

impl ChurnWeights {
    pub fn total(&self) -> f64 {
        self.recency_weight
            + self.tenure_weight
            + self.frequency_weight
            + self.support_weight
            + self.noise_weight
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClvFormulaConfig {
    pub lifespan_horizon_days: f64,
    pub lifespan_floor_days: f64,
    pub days_per_month: f64,
    /// CLV is discounted by `1 - churn * churn_discount`.
    pub churn_discount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentThresholds {
    /// Strictly above this is High.
    pub high: f64,
    /// Strictly above this (and not High) is Medium.
    pub medium: f64,
}

// ── Analysis ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    pub top_k: usize,
    /// Quantile of CLV a customer must strictly exceed to count as valuable.
    pub value_percentile: f64,
    pub at_risk_churn_threshold: f64,
    /// How many High-risk customers receive a strategy.
    pub strategy_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetentionRules {
    pub recency_days_above: f64,
    pub support_tickets_above: u64,
    pub email_opens_below: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryConfig {
    /// Presentation constant, not an estimate.
    pub projected_roi_improvement: f64,
    /// Share of value at risk assumed saved by campaigns.
    pub churn_prevention_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClvConfig {
    pub generator: GeneratorConfig,
    pub churn_weights: ChurnWeights,
    pub clv: ClvFormulaConfig,
    pub segments: SegmentThresholds,
    pub analysis: AnalysisConfig,
    pub retention_rules: RetentionRules,
    pub summary: SummaryConfig,
}

impl ClvConfig {
    /// Load from the data/ directory.
    /// In tests, use ClvConfig::reference().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/{CONFIG_FILE}");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ClvConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        log::debug!("config: loaded {path}");
        Ok(config)
    }

    /// The reference constants, hardcoded.
    pub fn reference() -> Self {
        Self {
            generator: GeneratorConfig {
                customer_count: 10_000,
                id_prefix: "CUST_".into(),
                id_width: 6,
                acquisition_offset_min_days: 30,
                acquisition_offset_max_days: 1095,
                spend_log_mean: 5.5,
                spend_log_sigma: 1.0,
                frequency_lambda: 3.0,
                frequency_shift: 1,
                recency_scale_days: 30.0,
                email_trials: 20,
                email_open_probability: 0.3,
                support_ticket_lambda: 0.5,
                app_session_lambda: 10.0,
            },
            churn_weights: ChurnWeights {
                recency_weight: 0.3,
                recency_horizon_days: 90.0,
                tenure_weight: 0.2,
                tenure_horizon_days: 60.0,
                frequency_weight: 0.2,
                frequency_target: 5.0,
                support_weight: 0.1,
                support_ticket_cap: 3.0,
                noise_weight: 0.2,
            },
            clv: ClvFormulaConfig {
                lifespan_horizon_days: 365.0,
                lifespan_floor_days: 30.0,
                days_per_month: 30.0,
                churn_discount: 0.5,
            },
            segments: SegmentThresholds {
                high: 0.7,
                medium: 0.4,
            },
            analysis: AnalysisConfig {
                top_k: 10,
                value_percentile: 0.8,
                at_risk_churn_threshold: 0.6,
                strategy_limit: 5,
            },
            retention_rules: RetentionRules {
                recency_days_above: 60.0,
                support_tickets_above: 2,
                email_opens_below: 5,
            },
            summary: SummaryConfig {
                projected_roi_improvement: 0.25,
                churn_prevention_rate: 0.4,
            },
        }
    }

    pub fn validate(&self) -> ClvResult<()> {
        let g = &self.generator;
        if g.acquisition_offset_max_days <= g.acquisition_offset_min_days {
            return invalid(format!(
                "acquisition offset range [{}, {}) is empty",
                g.acquisition_offset_min_days, g.acquisition_offset_max_days
            ));
        }
        if g.acquisition_offset_min_days < 0 {
            return invalid("acquisition offset must be non-negative".into());
        }
        if g.spend_log_sigma <= 0.0 || g.recency_scale_days <= 0.0 {
            return invalid("spend sigma and recency scale must be positive".into());
        }
        if g.frequency_lambda <= 0.0 || g.support_ticket_lambda <= 0.0 || g.app_session_lambda <= 0.0 {
            return invalid("poisson lambdas must be positive".into());
        }
        if !(0.0..=1.0).contains(&g.email_open_probability) {
            return invalid(format!(
                "email open probability {} outside [0, 1]",
                g.email_open_probability
            ));
        }

        let w = &self.churn_weights;
        if (w.total() - 1.0).abs() > 1e-9 {
            return invalid(format!("churn weights sum to {}, expected 1.0", w.total()));
        }
        if w.recency_horizon_days <= 0.0
            || w.tenure_horizon_days <= 0.0
            || w.frequency_target <= 0.0
            || w.support_ticket_cap <= 0.0
        {
            return invalid("churn horizons and caps must be positive".into());
        }

        if self.clv.days_per_month <= 0.0 {
            return invalid("days_per_month must be positive".into());
        }

        if self.segments.medium >= self.segments.high {
            return invalid(format!(
                "medium threshold {} must be below high threshold {}",
                self.segments.medium, self.segments.high
            ));
        }

        if !(0.0..=1.0).contains(&self.analysis.value_percentile) {
            return invalid(format!(
                "value percentile {} outside [0, 1]",
                self.analysis.value_percentile
            ));
        }
        Ok(())
    }
}

impl Default for ClvConfig {
    fn default() -> Self {
        Self::reference()
    }
}

fn invalid<T>(reason: String) -> ClvResult<T> {
    Err(ClvError::InvalidConfig { reason })
}

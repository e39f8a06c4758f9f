//! The stage event log.
//!
//! RULE: Every pipeline stage records exactly one event when it
//! completes. The log lives in memory for the duration of one run;
//! nothing is persisted.

use crate::{scorer::ScorerKind, types::RunId};
use serde::{Deserialize, Serialize};

/// Every event emitted during a run.
/// Variants are only ever appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunInitialized {
        run_id: RunId,
        seed: u64,
        customer_count: usize,
        scorer: ScorerKind,
    },
    CustomersGenerated {
        count: usize,
        avg_clv: f64,
        high_risk_count: usize,
        out_of_range_churn: usize,
    },
    SegmentsAnalyzed {
        segment_count: usize,
        top_k: usize,
        at_risk_count: usize,
        at_risk_value: f64,
    },
    StrategiesAssigned {
        count: usize,
    },
    SummaryCompleted {
        value_at_risk: f64,
        expected_churn_prevention: f64,
    },
}

impl PipelineEvent {
    /// Stable name for the `event_type` field of a log entry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } => "run_initialized",
            Self::CustomersGenerated { .. } => "customers_generated",
            Self::SegmentsAnalyzed { .. } => "segments_analyzed",
            Self::StrategiesAssigned { .. } => "strategies_assigned",
            Self::SummaryCompleted { .. } => "summary_completed",
        }
    }
}

/// One entry of the in-memory log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventLogEntry {
    pub run_id: RunId,
    pub sequence: u64,
    pub stage: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized PipelineEvent
}

//! The analysis engine: one self-contained run of the pipeline.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Generator      : synthetic records from the seeded stream
//!   2. Segmentation   : segment stats, top-k, at-risk-valuable subset
//!   3. Retention      : strategies for the first High-risk customers
//!   4. Summary        : executive metrics
//!
//! RULES:
//!   - Each stage consumes the previous stage's output read-only.
//!   - Records are never mutated after generation.
//!   - All randomness flows through the RngBank.
//!   - Every stage records one event in the run's log.

use crate::{
    config::ClvConfig,
    customer::{CustomerGenerator, CustomerRecord, RiskSegment},
    error::ClvResult,
    event::{EventLogEntry, PipelineEvent},
    retention::{recommend, RetentionStrategy},
    scorer::{FormulaScorer, Scorer, ScorerKind},
    segmentation::{analyze, mean, ClvAnalysis},
    summary::ExecutiveSummary,
    types::RunId,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Engine,
    Generator,
    Segmentation,
    Retention,
    Summary,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Generator => "generator",
            Self::Segmentation => "segmentation",
            Self::Retention => "retention",
            Self::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub run_id: RunId,
    pub seed: u64,
    pub as_of: NaiveDateTime,
    pub scorer: ScorerKind,
    pub analysis: ClvAnalysis,
    pub strategies: Vec<RetentionStrategy>,
    pub summary: ExecutiveSummary,
}

pub struct AnalysisEngine {
    pub run_id: RunId,
    seed: u64,
    config: ClvConfig,
    scorer: Box<dyn Scorer>,
    as_of: NaiveDateTime,
    records: Vec<CustomerRecord>,
    log: Vec<EventLogEntry>,
}

impl AnalysisEngine {
    pub fn new(
        run_id: RunId,
        seed: u64,
        config: ClvConfig,
        scorer: Box<dyn Scorer>,
        as_of: NaiveDateTime,
    ) -> Self {
        Self {
            run_id,
            seed,
            config,
            scorer,
            as_of,
            records: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Engine backed by the formula scorer.
    pub fn build(run_id: RunId, seed: u64, config: ClvConfig, as_of: NaiveDateTime) -> Self {
        let scorer = Box::new(FormulaScorer::new(&config));
        Self::new(run_id, seed, config, scorer, as_of)
    }

    pub fn config(&self) -> &ClvConfig {
        &self.config
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    /// Records of the most recent run, in generation order.
    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn event_log(&self) -> &[EventLogEntry] {
        &self.log
    }

    /// Run every stage over `customer_count` fresh records.
    /// State from any previous run is discarded first.
    pub fn run(&mut self, customer_count: usize) -> ClvResult<AnalysisReport> {
        self.records.clear();
        self.log.clear();

        self.record(
            Stage::Engine,
            PipelineEvent::RunInitialized {
                run_id: self.run_id.clone(),
                seed: self.seed,
                customer_count,
                scorer: self.scorer.kind(),
            },
        )?;

        // 1. Generator
        let records = CustomerGenerator::new(&self.config, self.scorer.as_ref(), self.as_of)
            .generate_seeded(customer_count, self.seed)?;
        let high_risk_count = records
            .iter()
            .filter(|c| c.risk_segment == RiskSegment::High)
            .count();
        let out_of_range = records.iter().filter(|c| !c.churn_in_unit_range()).count();
        if out_of_range > 0 {
            log::debug!("generator: {out_of_range} churn probabilities outside [0, 1]");
        }
        log::info!(
            "run={} generator: {} customers, {} high risk",
            self.run_id,
            records.len(),
            high_risk_count,
        );
        self.record(
            Stage::Generator,
            PipelineEvent::CustomersGenerated {
                count: records.len(),
                avg_clv: mean(records.iter().map(|c| c.predicted_clv)),
                high_risk_count,
                out_of_range_churn: out_of_range,
            },
        )?;

        // 2. Segmentation
        let analysis = analyze(&records, &self.config.analysis);
        log::info!(
            "run={} segmentation: {} at-risk valuable customers",
            self.run_id,
            analysis.at_risk.count,
        );
        self.record(
            Stage::Segmentation,
            PipelineEvent::SegmentsAnalyzed {
                segment_count: analysis.segments.len(),
                top_k: analysis.top_customers.len(),
                at_risk_count: analysis.at_risk.count,
                at_risk_value: analysis.at_risk.total_clv,
            },
        )?;

        // 3. Retention
        let strategies = recommend(
            &records,
            self.config.analysis.strategy_limit,
            &self.config.retention_rules,
        );
        log::info!("run={} retention: {} strategies", self.run_id, strategies.len());
        self.record(
            Stage::Retention,
            PipelineEvent::StrategiesAssigned {
                count: strategies.len(),
            },
        )?;

        // 4. Summary
        let summary = ExecutiveSummary::from_parts(&analysis, &strategies, &self.config.summary);
        self.record(
            Stage::Summary,
            PipelineEvent::SummaryCompleted {
                value_at_risk: summary.value_at_risk,
                expected_churn_prevention: summary.expected_churn_prevention,
            },
        )?;

        self.records = records;
        Ok(AnalysisReport {
            run_id: self.run_id.clone(),
            seed: self.seed,
            as_of: self.as_of,
            scorer: self.scorer.kind(),
            analysis,
            strategies,
            summary,
        })
    }

    fn record(&mut self, stage: Stage, event: PipelineEvent) -> ClvResult<()> {
        let entry = EventLogEntry {
            run_id: self.run_id.clone(),
            sequence: self.log.len() as u64,
            stage: stage.name().to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(&event)?,
        };
        log::debug!("run={} event #{} {}", self.run_id, entry.sequence, entry.event_type);
        self.log.push(entry);
        Ok(())
    }
}

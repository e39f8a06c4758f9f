//! Segment aggregates, value ranking and the at-risk-valuable filter.
//!
//! Everything here is recomputed from the record slice on each call;
//! nothing is cached between calls.

use crate::{
    config::AnalysisConfig,
    customer::{CustomerRecord, RiskSegment},
    types::{round_to, CustomerId},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentStats {
    pub segment: RiskSegment,
    pub count: usize,
    pub mean_clv: f64,
    pub median_clv: f64,
    pub mean_churn_probability: f64,
    pub mean_monthly_spend: f64,
    pub mean_tenure_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopCustomer {
    pub customer_id: CustomerId,
    pub predicted_clv: f64,
    pub risk_segment: RiskSegment,
    pub monthly_spend: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AtRiskSummary {
    /// CLV a customer must strictly exceed. `None` when there were no records.
    pub threshold_clv: Option<f64>,
    pub count: usize,
    pub total_clv: f64,
    pub customer_ids: Vec<CustomerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClvAnalysis {
    pub total_customers: usize,
    pub avg_clv: f64,
    pub high_risk_count: usize,
    pub segments: Vec<SegmentStats>,
    pub top_customers: Vec<TopCustomer>,
    pub at_risk: AtRiskSummary,
}

pub fn analyze(records: &[CustomerRecord], config: &AnalysisConfig) -> ClvAnalysis {
    let analysis = ClvAnalysis {
        total_customers: records.len(),
        avg_clv: mean(records.iter().map(|c| c.predicted_clv)),
        high_risk_count: records
            .iter()
            .filter(|c| c.risk_segment == RiskSegment::High)
            .count(),
        segments: segment_stats(records),
        top_customers: top_by_clv(records, config.top_k),
        at_risk: at_risk_valuable(
            records,
            config.value_percentile,
            config.at_risk_churn_threshold,
        ),
    };
    log::debug!(
        "segmentation: {} segments, {} at risk worth {:.2}",
        analysis.segments.len(),
        analysis.at_risk.count,
        analysis.at_risk.total_clv,
    );
    analysis
}

/// Per-segment aggregates in High, Medium, Low order.
/// Segments without members are omitted.
pub fn segment_stats(records: &[CustomerRecord]) -> Vec<SegmentStats> {
    RiskSegment::ALL
        .iter()
        .filter_map(|segment| {
            let members: Vec<&CustomerRecord> = records
                .iter()
                .filter(|c| c.risk_segment == *segment)
                .collect();
            if members.is_empty() {
                return None;
            }
            let clvs: Vec<f64> = members.iter().map(|c| c.predicted_clv).collect();
            Some(SegmentStats {
                segment: *segment,
                count: members.len(),
                mean_clv: round_to(mean(clvs.iter().copied()), 2),
                median_clv: round_to(median(&clvs).unwrap_or(0.0), 2),
                mean_churn_probability: round_to(
                    mean(members.iter().map(|c| c.churn_probability)),
                    2,
                ),
                mean_monthly_spend: round_to(mean(members.iter().map(|c| c.monthly_spend)), 2),
                mean_tenure_days: round_to(
                    mean(members.iter().map(|c| c.tenure_days as f64)),
                    2,
                ),
            })
        })
        .collect()
}

/// The `k` highest-CLV customers, descending. Ties keep generation order.
pub fn top_by_clv(records: &[CustomerRecord], k: usize) -> Vec<TopCustomer> {
    let mut ranked: Vec<&CustomerRecord> = records.iter().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| {
        b.predicted_clv
            .partial_cmp(&a.predicted_clv)
            .unwrap_or(Ordering::Equal)
    });
    ranked
        .into_iter()
        .take(k)
        .map(|c| TopCustomer {
            customer_id: c.customer_id.clone(),
            predicted_clv: c.predicted_clv,
            risk_segment: c.risk_segment,
            monthly_spend: c.monthly_spend,
        })
        .collect()
}

/// Customers whose CLV is strictly above the `value_percentile` point of
/// all CLVs and whose churn probability is strictly above `churn_threshold`.
pub fn at_risk_valuable(
    records: &[CustomerRecord],
    value_percentile: f64,
    churn_threshold: f64,
) -> AtRiskSummary {
    let clvs: Vec<f64> = records.iter().map(|c| c.predicted_clv).collect();
    let Some(threshold_clv) = percentile(&clvs, value_percentile) else {
        return AtRiskSummary::default();
    };

    let mut summary = AtRiskSummary {
        threshold_clv: Some(threshold_clv),
        ..AtRiskSummary::default()
    };
    for c in records
        .iter()
        .filter(|c| c.predicted_clv > threshold_clv && c.churn_probability > churn_threshold)
    {
        summary.count += 1;
        summary.total_clv += c.predicted_clv;
        summary.customer_ids.push(c.customer_id.clone());
    }
    summary
}

/// Percentile (`q` in [0, 1]) with linear interpolation between the closest ranks.
/// `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 0.5)
}

/// Arithmetic mean; 0 for an empty iterator.
pub fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

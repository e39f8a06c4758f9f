//! Request routing for the network-facing shell.
//!
//! Transport-agnostic: a request is `{method, path, body}` and a
//! response is `{status, headers, body}`. The runner serves this over
//! JSON lines; an HTTP server would map 1:1.
//!
//! RULE: every request runs its own pipeline with its own scorer
//! instance. Nothing mutable is shared between requests.

use crate::{
    config::ClvConfig,
    customer::{acquisition_date, CustomerGenerator, CustomerProfile},
    error::{ClvError, ClvResult},
    pipeline::{AnalysisEngine, AnalysisReport},
    retention::{select_action, RetentionAction},
    scorer::{select_scorer, ScorerKind},
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const SERVICE_NAME: &str = "Customer Lifetime Value & Churn Prediction Platform";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_SEED: u64 = 42;
pub const MAX_CUSTOMERS_PER_REQUEST: usize = 1_000_000;

const CAPABILITIES: [&str; 5] = [
    "Customer lifetime value prediction",
    "Churn probability analysis",
    "Automated retention campaigns",
    "Customer segmentation",
    "Risk scoring",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRequest {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: Value,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl ServiceResponse {
    pub fn new(status: u16, body: Value) -> Self {
        let headers = [
            ("access-control-allow-origin", "*"),
            ("access-control-allow-methods", "*"),
            ("access-control-allow-headers", "*"),
            ("content-type", "application/json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            status,
            headers,
            body,
        }
    }

    /// Reply for a request line that could not be decoded at all.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(400, json!({ "detail": detail.into() }))
    }

    fn from_error(err: &ClvError) -> Self {
        match err {
            ClvError::RouteNotFound { .. } => Self::new(404, json!({ "detail": "Not Found" })),
            ClvError::MethodNotAllowed { .. } => {
                Self::new(405, json!({ "detail": "Method Not Allowed" }))
            }
            ClvError::InvalidRequest { reason } => Self::new(422, json!({ "detail": reason })),
            other => Self::new(
                500,
                json!({ "detail": format!("Internal server error: {other}") }),
            ),
        }
    }
}

/// Knobs a request body may set. Everything is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunParams {
    pub seed: Option<u64>,
    pub customers: Option<usize>,
    pub top_k: Option<usize>,
    pub limit: Option<usize>,
    pub as_of: Option<NaiveDateTime>,
}

pub struct ClvService {
    config: ClvConfig,
    scorer: ScorerKind,
}

impl ClvService {
    pub fn new(config: ClvConfig, scorer: ScorerKind) -> Self {
        Self { config, scorer }
    }

    pub fn handle(&self, request: &ServiceRequest) -> ServiceResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        match self.dispatch(&request_id, request) {
            Ok(body) => ServiceResponse::new(200, body),
            Err(e) => {
                log::warn!(
                    "request={request_id} {} {} failed: {e}",
                    request.method,
                    request.path
                );
                ServiceResponse::from_error(&e)
            }
        }
    }

    fn dispatch(&self, request_id: &str, request: &ServiceRequest) -> ClvResult<Value> {
        let path = normalize(&request.path);
        let method = request.method.to_ascii_uppercase();
        log::debug!("request={request_id} {method} {path}");

        let expected = match path {
            "/" | "/health" => "GET",
            "/api/v1/predictions/clv"
            | "/api/v1/predictions/report"
            | "/api/v1/churn/at-risk"
            | "/api/v1/churn/score"
            | "/api/v1/automation/strategies" => "POST",
            _ => {
                return Err(ClvError::RouteNotFound {
                    path: path.to_string(),
                })
            }
        };
        if method != expected {
            return Err(ClvError::MethodNotAllowed {
                method,
                path: path.to_string(),
            });
        }

        match path {
            "/" => Ok(json!({
                "message": SERVICE_NAME,
                "version": SERVICE_VERSION,
                "status": "active",
                "capabilities": CAPABILITIES,
            })),
            "/health" => Ok(json!({
                "status": "healthy",
                "version": SERVICE_VERSION,
                "scorer": self.active_scorer().name(),
            })),
            "/api/v1/predictions/clv" => {
                let report = self.run(request_id, parse_params(&request.body)?)?;
                Ok(json!({
                    "run_id": report.run_id,
                    "total_customers": report.analysis.total_customers,
                    "avg_clv": report.analysis.avg_clv,
                    "segments": report.analysis.segments,
                    "top_customers": report.analysis.top_customers,
                }))
            }
            "/api/v1/predictions/report" => {
                let report = self.run(request_id, parse_params(&request.body)?)?;
                Ok(serde_json::to_value(report)?)
            }
            "/api/v1/churn/at-risk" => {
                let report = self.run(request_id, parse_params(&request.body)?)?;
                Ok(json!({
                    "run_id": report.run_id,
                    "high_risk_count": report.analysis.high_risk_count,
                    "at_risk": report.analysis.at_risk,
                    "expected_churn_prevention": report.summary.expected_churn_prevention,
                }))
            }
            "/api/v1/churn/score" => self.score(&request.body),
            "/api/v1/automation/strategies" => {
                let report = self.run(request_id, parse_params(&request.body)?)?;
                Ok(json!({
                    "run_id": report.run_id,
                    "strategies": report.strategies,
                }))
            }
            _ => Err(ClvError::RouteNotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Kind of scorer a request would actually get after fallback.
    pub fn active_scorer(&self) -> ScorerKind {
        select_scorer(self.scorer, &self.config).kind()
    }

    fn run(&self, request_id: &str, params: RunParams) -> ClvResult<AnalysisReport> {
        let customers = params
            .customers
            .unwrap_or(self.config.generator.customer_count);
        if customers > MAX_CUSTOMERS_PER_REQUEST {
            return Err(ClvError::InvalidRequest {
                reason: format!(
                    "customers={customers} exceeds the per-request limit of {MAX_CUSTOMERS_PER_REQUEST}"
                ),
            });
        }

        let mut config = self.config.clone();
        if let Some(k) = params.top_k {
            config.analysis.top_k = k;
        }
        if let Some(limit) = params.limit {
            config.analysis.strategy_limit = limit;
        }

        let as_of = params.as_of.unwrap_or_else(|| Utc::now().naive_utc());
        if acquisition_date(as_of, config.generator.acquisition_offset_max_days).is_err() {
            return Err(ClvError::InvalidRequest {
                reason: format!("as_of={as_of} is too early to place acquisition dates before it"),
            });
        }

        let scorer = select_scorer(self.scorer, &config);
        let mut engine = AnalysisEngine::new(
            request_id.to_string(),
            params.seed.unwrap_or(DEFAULT_SEED),
            config,
            scorer,
            as_of,
        );
        engine.run(customers)
    }

    fn score(&self, body: &Value) -> ClvResult<Value> {
        let profile: CustomerProfile =
            serde_json::from_value(body.clone()).map_err(|e| ClvError::InvalidRequest {
                reason: e.to_string(),
            })?;
        if !profile.monthly_spend.is_finite() || profile.monthly_spend < 0.0 {
            return Err(ClvError::InvalidRequest {
                reason: "monthly_spend must be a non-negative number".into(),
            });
        }
        if !(0.0..1.0).contains(&profile.noise) {
            return Err(ClvError::InvalidRequest {
                reason: "noise must be in [0, 1)".into(),
            });
        }
        if profile.tenure_days < 0 {
            return Err(ClvError::InvalidRequest {
                reason: "tenure_days must be non-negative".into(),
            });
        }
        if !profile.recency.is_finite() || profile.recency < 0.0 {
            return Err(ClvError::InvalidRequest {
                reason: "recency must be a non-negative number".into(),
            });
        }

        let scorer = select_scorer(self.scorer, &self.config);
        let generator = CustomerGenerator::new(
            &self.config,
            scorer.as_ref(),
            Utc::now().naive_utc(),
        );
        let score = generator.score_profile(&profile)?;
        let action: RetentionAction = select_action((&profile).into(), &self.config.retention_rules);

        let mut body = serde_json::to_value(score)?;
        if let Value::Object(map) = &mut body {
            map.insert("recommended_action".into(), serde_json::to_value(action)?);
            map.insert("strategy".into(), json!(action.description()));
        }
        Ok(body)
    }
}

fn parse_params(body: &Value) -> ClvResult<RunParams> {
    if body.is_null() {
        return Ok(RunParams::default());
    }
    serde_json::from_value(body.clone()).map_err(|e| ClvError::InvalidRequest {
        reason: e.to_string(),
    })
}

fn normalize(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

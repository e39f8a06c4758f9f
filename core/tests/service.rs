//! Request routing: status codes, CORS headers and per-request runs.

use clv_core::{
    config::ClvConfig,
    scorer::ScorerKind,
    service::{ClvService, ServiceRequest, ServiceResponse},
};
use serde_json::{json, Value};

fn service() -> ClvService {
    let _ = env_logger::try_init();
    ClvService::new(ClvConfig::reference(), ScorerKind::FittedModel)
}

fn call(method: &str, path: &str, body: Value) -> ServiceResponse {
    service().handle(&ServiceRequest {
        method: method.into(),
        path: path.into(),
        body,
    })
}

fn small_run() -> Value {
    json!({ "seed": 42, "customers": 400, "as_of": "2024-01-01T00:00:00" })
}

#[test]
fn root_lists_capabilities() {
    let res = call("GET", "/", Value::Null);
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "active");
    assert_eq!(res.body["capabilities"].as_array().unwrap().len(), 5);
}

#[test]
fn health_reports_fallback_scorer() {
    let res = call("GET", "/health/", Value::Null);
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["scorer"], "formula");
}

#[test]
fn every_response_carries_cors_headers() {
    for res in [
        call("GET", "/health", Value::Null),
        call("GET", "/nope", Value::Null),
    ] {
        assert_eq!(res.headers["access-control-allow-origin"], "*");
        assert_eq!(res.headers["access-control-allow-methods"], "*");
        assert_eq!(res.headers["access-control-allow-headers"], "*");
    }
}

#[test]
fn unknown_route_is_404_and_wrong_method_is_405() {
    let res = call("GET", "/api/v2/anything", Value::Null);
    assert_eq!(res.status, 404);
    assert_eq!(res.body["detail"], "Not Found");

    let res = call("GET", "/api/v1/predictions/clv", Value::Null);
    assert_eq!(res.status, 405);
}

#[test]
fn clv_route_returns_top_customers() {
    let res = call(
        "POST",
        "/api/v1/predictions/clv",
        json!({ "seed": 42, "customers": 400, "top_k": 3, "as_of": "2024-01-01T00:00:00" }),
    );
    assert_eq!(res.status, 200, "body: {}", res.body);
    let top = res.body["top_customers"].as_array().unwrap();
    assert_eq!(top.len(), 3);
    let clvs: Vec<f64> = top
        .iter()
        .map(|t| t["predicted_clv"].as_f64().unwrap())
        .collect();
    assert!(clvs.windows(2).all(|w| w[0] >= w[1]), "not descending: {clvs:?}");
    assert_eq!(res.body["total_customers"], 400);
}

#[test]
fn requests_are_independent_runs() {
    let a = call("POST", "/api/v1/predictions/report", small_run());
    let b = call("POST", "/api/v1/predictions/report", small_run());
    assert_eq!(a.status, 200);
    assert_ne!(a.body["run_id"], b.body["run_id"], "each request gets its own id");
    assert_eq!(a.body["analysis"], b.body["analysis"], "same seed, same numbers");
    assert_eq!(a.body["summary"], b.body["summary"]);
}

#[test]
fn at_risk_route_reports_value() {
    let res = call("POST", "/api/v1/churn/at-risk", small_run());
    assert_eq!(res.status, 200);
    let at_risk = &res.body["at_risk"];
    assert_eq!(
        at_risk["count"].as_u64().unwrap() as usize,
        at_risk["customer_ids"].as_array().unwrap().len()
    );
    let value = at_risk["total_clv"].as_f64().unwrap();
    let prevention = res.body["expected_churn_prevention"].as_f64().unwrap();
    assert!((prevention - value * 0.4).abs() < 1e-6);
}

#[test]
fn strategies_route_honors_limit() {
    let mut body = small_run();
    body["limit"] = json!(2);
    let res = call("POST", "/api/v1/automation/strategies", body);
    assert_eq!(res.status, 200);
    assert!(res.body["strategies"].as_array().unwrap().len() <= 2);
}

#[test]
fn score_route_applies_formula_and_rules() {
    let res = call(
        "POST",
        "/api/v1/churn/score",
        json!({
            "customer_id": "EXT_9",
            "tenure_days": 20,
            "monthly_spend": 300.0,
            "frequency": 1,
            "recency": 70.0,
            "email_opens": 10,
            "support_tickets": 0,
            "noise": 0.5
        }),
    );
    assert_eq!(res.status, 200, "body: {}", res.body);
    // 0.3·70/90 + 0.2·40/60 + 0.2·4/5 + 0 + 0.2·0.5 = 0.6266…
    assert_eq!(res.body["churn_probability"], 0.627);
    assert_eq!(res.body["risk_segment"], "Medium");
    assert_eq!(res.body["avg_order_value"], 300.0);
    assert_eq!(res.body["recommended_action"], "re_engagement_email");
    assert_eq!(
        res.body["strategy"],
        "Re-engagement email series with personalized offers"
    );
}

#[test]
fn malformed_bodies_are_422() {
    let res = call("POST", "/api/v1/churn/score", json!({ "customer_id": "X" }));
    assert_eq!(res.status, 422);

    let res = call("POST", "/api/v1/predictions/report", json!({ "seed": "forty-two" }));
    assert_eq!(res.status, 422);

    let res = call(
        "POST",
        "/api/v1/predictions/report",
        json!({ "customers": 50_000_000u64 }),
    );
    assert_eq!(res.status, 422);
}

#[test]
fn empty_run_is_not_an_error() {
    let res = call(
        "POST",
        "/api/v1/predictions/report",
        json!({ "customers": 0, "as_of": "2024-01-01T00:00:00" }),
    );
    assert_eq!(res.status, 200);
    assert_eq!(res.body["analysis"]["total_customers"], 0);
    assert_eq!(res.body["analysis"]["at_risk"]["count"], 0);
    assert!(res.body["analysis"]["at_risk"]["threshold_clv"].is_null());
}

#[test]
fn as_of_too_early_for_acquisition_dates_is_422() {
    let res = call(
        "POST",
        "/api/v1/predictions/report",
        json!({ "customers": 1, "as_of": "-262143-01-01T00:00:00" }),
    );
    assert_eq!(res.status, 422, "body: {}", res.body);
    assert!(res.body["detail"].as_str().unwrap().contains("as_of"));
    assert_eq!(res.headers["content-type"], "application/json");
}

#[test]
fn negative_recency_is_422() {
    let mut profile = json!({
        "customer_id": "EXT_3",
        "tenure_days": 100,
        "monthly_spend": 50.0,
        "frequency": 2,
        "recency": -1.0,
        "email_opens": 4,
        "support_tickets": 0
    });
    let res = call("POST", "/api/v1/churn/score", profile.clone());
    assert_eq!(res.status, 422);
    assert_eq!(res.body["detail"], "recency must be a non-negative number");

    profile["recency"] = json!(0.0);
    assert_eq!(call("POST", "/api/v1/churn/score", profile).status, 200);
}

#[test]
fn score_route_rounds_exact_halves_to_even() {
    let res = call(
        "POST",
        "/api/v1/churn/score",
        json!({
            "customer_id": "EXT_4",
            "tenure_days": 100,
            "monthly_spend": 0.125,
            "frequency": 1,
            "recency": 10.0,
            "email_opens": 4,
            "support_tickets": 0
        }),
    );
    assert_eq!(res.status, 200, "body: {}", res.body);
    assert_eq!(res.body["avg_order_value"], 0.12);
}

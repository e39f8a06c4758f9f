//! clv-runner: demo runner for the CLV & churn platform.
//!
//! Usage:
//!   clv-runner
//!   clv-runner --seed 7 --customers 2000 --data-dir ./data
//!   clv-runner --ipc-mode        (JSON request per stdin line)

use anyhow::Result;
use clv_core::{
    config::ClvConfig,
    pipeline::{AnalysisEngine, AnalysisReport},
    preflight::{self, Capability},
    scorer::ScorerKind,
    service::{ClvService, ServiceRequest, ServiceResponse, DEFAULT_SEED},
};
use std::env;
use std::io::{self, BufRead, Write};

const RULE: &str = "================================================================================";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", DEFAULT_SEED);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].clone());

    if ipc_mode {
        return run_ipc_loop(data_dir.as_deref());
    }

    print_header();

    let caps = preflight::standard_capabilities(data_dir.as_deref());
    print_capabilities(&caps);
    if let Err(e) = preflight::check(&caps) {
        println!();
        println!("MISSING DEPENDENCIES");
        println!("  {e}");
        std::process::exit(1);
    }

    println!();
    println!("{RULE}");
    println!("STARTING CLTV & CHURN PREDICTION ANALYSIS");
    println!("{RULE}");

    if let Err(e) = run_demo(&args, seed, data_dir.as_deref()) {
        println!();
        println!("ERROR: {e}");
        println!("Please check the error above and try again.");
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(data_dir: Option<&str>) -> Result<ClvConfig> {
    match data_dir {
        Some(dir) => ClvConfig::load(dir),
        None => Ok(ClvConfig::reference()),
    }
}

fn run_demo(args: &[String], seed: u64, data_dir: Option<&str>) -> Result<()> {
    let mut config = load_config(data_dir)?;
    config.generator.customer_count =
        parse_arg(args, "--customers", config.generator.customer_count);
    let customers = config.generator.customer_count;

    let run_id = format!("run-{seed}-{}", unix_seconds());
    let as_of = chrono::Utc::now().naive_utc();
    let mut engine = AnalysisEngine::build(run_id, seed, config, as_of);
    let report = engine.run(customers)?;

    print_generation(&report);
    print_analysis(&report);
    print_strategies(&report);
    print_summary(&report);
    Ok(())
}

fn run_ipc_loop(data_dir: Option<&str>) -> Result<()> {
    let service = ClvService::new(load_config(data_dir)?, ScorerKind::FittedModel);
    log::info!("ipc: serving with scorer={}", service.active_scorer().name());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }
        if buffer.trim() == "quit" {
            break;
        }

        let response = handle_line(&service, &buffer);
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    log::info!("ipc: stdin closed, shutting down");
    Ok(())
}

/// One IPC line in, one response out. Undecodable lines get a 400 with
/// the same shape as every routed reply.
fn handle_line(service: &ClvService, line: &str) -> ServiceResponse {
    match serde_json::from_str::<ServiceRequest>(line) {
        Ok(request) => service.handle(&request),
        Err(e) => {
            log::warn!("ipc: undecodable request line: {e}");
            ServiceResponse::malformed(e.to_string())
        }
    }
}

// ── Console sections ─────────────────────────────────────────────────────────

fn print_header() {
    println!("{RULE}");
    println!("CUSTOMER LIFETIME VALUE & CHURN PREDICTION PLATFORM");
    println!("{RULE}");
    println!("Predictive customer scoring with rule-based retention strategies");
    println!();
}

fn print_capabilities(caps: &[Capability]) {
    println!("[SYSTEM] CHECKING DEPENDENCIES");
    println!("{}", "-".repeat(40));
    for c in caps {
        let version = c.version.as_deref().unwrap_or("-");
        if c.available {
            println!("✓ {:<15} v{:<8} - {}", c.name, version, c.description);
        } else if c.required {
            println!("✗ {:<15} MISSING   - {}", c.name, c.description);
        } else {
            println!("- {:<15} optional  - {}", c.name, c.description);
        }
    }
    let required: Vec<_> = caps.iter().filter(|c| c.required).collect();
    let found = required.iter().filter(|c| c.available).count();
    println!();
    println!("Found {found}/{} required components", required.len());
}

fn print_generation(report: &AnalysisReport) {
    let a = &report.analysis;
    println!("[DEMO] GENERATING CUSTOMER DATA");
    println!("{}", "-".repeat(40));
    println!("✓ Generated {} customer records", thousands(a.total_customers as f64));
    println!("✓ Average CLV: ${:.2}", a.avg_clv);
    println!("✓ High-risk customers: {}", thousands(a.high_risk_count as f64));
}

fn print_analysis(report: &AnalysisReport) {
    let a = &report.analysis;
    println!();
    println!("[ANALYSIS] CUSTOMER LIFETIME VALUE MODELING");
    println!("{}", "-".repeat(50));
    println!("Customer Segmentation Analysis:");
    println!(
        "  {:<8} {:>7} {:>10} {:>11} {:>7} {:>9} {:>8}",
        "Segment", "Count", "Mean CLV", "Median CLV", "Churn", "Spend", "Tenure"
    );
    for s in &a.segments {
        println!(
            "  {:<8} {:>7} {:>10.2} {:>11.2} {:>7.2} {:>9.2} {:>8.2}",
            s.segment.label(),
            s.count,
            s.mean_clv,
            s.median_clv,
            s.mean_churn_probability,
            s.mean_monthly_spend,
            s.mean_tenure_days,
        );
    }

    println!();
    println!("Top {} Most Valuable Customers:", a.top_customers.len());
    for c in &a.top_customers {
        println!(
            "  {}: ${} CLV ({} risk)",
            c.customer_id,
            thousands(c.predicted_clv),
            c.risk_segment.label()
        );
    }

    println!();
    println!(
        "HIGH PRIORITY: {} high-value customers at risk of churn",
        a.at_risk.count
    );
    println!("   Combined CLV at risk: ${}", thousands(a.at_risk.total_clv));
}

fn print_strategies(report: &AnalysisReport) {
    println!();
    println!("[STRATEGY] AUTOMATED RETENTION CAMPAIGNS");
    println!("{}", "-".repeat(50));
    println!("Recommended Retention Actions:");
    for s in &report.strategies {
        println!(
            "  {} (${:.0} CLV, {:.1}% risk)",
            s.customer_id,
            s.clv,
            s.churn_risk * 100.0
        );
        println!("    → {}", s.strategy);
        println!();
    }
}

fn print_summary(report: &AnalysisReport) {
    let s = &report.summary;
    println!();
    println!("{RULE}");
    println!("EXECUTIVE SUMMARY");
    println!("{RULE}");
    println!("  Total Customers Analyzed:          {}", thousands(s.total_customers as f64));
    println!("  Average Customer Lifetime Value:   ${}", thousands(s.avg_clv));
    println!("  High-Risk Customers:               {}", thousands(s.high_risk_count as f64));
    println!("  Value at Risk:                     ${}", thousands(s.value_at_risk));
    println!("  Retention Strategies Generated:    {}", s.strategies_generated);
    println!();
    println!("CLTV ANALYSIS COMPLETE");
    println!(
        "  Projected ROI from retention campaigns: {:.0}% improvement",
        s.projected_roi_improvement * 100.0
    );
    println!(
        "  Expected churn prevention: ${}",
        thousands(s.expected_churn_prevention)
    );
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Whole-number formatting with comma grouping, e.g. 1234567.8 → "1,234,568".
fn thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn unix_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

use std::io::Write as _;
use std::path::Path;

use serde::Serialize;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _plan_path: &Path, _plan: &prxbench_core::BenchPlan) {}

    fn progress(&self) -> Option<prxbench_core::ProgressFn> {
        None
    }

    fn print_summary(&self, snapshot: &prxbench_metrics::RunSnapshot) -> anyhow::Result<()> {
        let line = build_summary_line(snapshot);
        emit_json_line(&line);
        Ok(())
    }

    fn print_violations(&self, violations: &[prxbench_core::ThresholdViolation]) {
        if violations.is_empty() {
            return;
        }
        let line = JsonThresholdsLine {
            kind: "thresholds",
            violations: violations
                .iter()
                .map(|v| JsonViolation {
                    scenario: v.scenario.clone(),
                    endpoint: v.endpoint.clone(),
                    gate: v.gate,
                    limit: v.limit,
                    observed: v.observed,
                })
                .collect(),
        };
        emit_json_line(&line);
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub scenarios: Vec<JsonScenario>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonScenario {
    pub scenario: String,
    pub endpoints: Vec<JsonEndpoint>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonEndpoint {
    pub endpoint: String,

    pub attempts: u64,
    pub successes: u64,
    pub errors: u64,
    pub timeouts: u64,

    pub success_rate: f64,
    pub error_rate: f64,
    pub timeout_rate: f64,

    /// Seconds.
    pub avg_response_time: f64,
    pub percentiles: JsonPercentiles,

    pub proxies: Vec<JsonProxy>,
    pub error_samples: Vec<String>,
}

/// Seconds.
#[derive(Debug, Serialize)]
pub(crate) struct JsonPercentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProxy {
    pub proxy: String,
    pub attempts: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub avg_response_time: f64,
}

#[derive(Debug, Serialize)]
struct JsonThresholdsLine {
    kind: &'static str,
    violations: Vec<JsonViolation>,
}

#[derive(Debug, Serialize)]
struct JsonViolation {
    scenario: String,
    endpoint: String,
    gate: &'static str,
    limit: f64,
    observed: f64,
}

fn secs(micros: u64) -> f64 {
    micros as f64 / 1e6
}

fn build_summary_line(snapshot: &prxbench_metrics::RunSnapshot) -> JsonSummaryLine {
    let scenarios = snapshot
        .scenarios
        .iter()
        .map(|s| JsonScenario {
            scenario: s.scenario.clone(),
            endpoints: s
                .endpoints
                .iter()
                .map(|e| JsonEndpoint {
                    endpoint: e.endpoint.clone(),
                    attempts: e.attempts,
                    successes: e.successes,
                    errors: e.errors,
                    timeouts: e.timeouts,
                    success_rate: e.success_rate,
                    error_rate: e.error_rate,
                    timeout_rate: e.timeout_rate,
                    avg_response_time: e.avg_response_time,
                    percentiles: JsonPercentiles {
                        p50: secs(e.percentiles.p50),
                        p75: secs(e.percentiles.p75),
                        p90: secs(e.percentiles.p90),
                        p95: secs(e.percentiles.p95),
                        p99: secs(e.percentiles.p99),
                    },
                    proxies: e
                        .proxies
                        .iter()
                        .map(|p| JsonProxy {
                            proxy: p.proxy.clone(),
                            attempts: p.attempts,
                            successes: p.successes,
                            success_rate: p.success_rate,
                            avg_response_time: p.avg_response_time,
                        })
                        .collect(),
                    error_samples: e.error_samples.clone(),
                })
                .collect(),
        })
        .collect();

    JsonSummaryLine {
        kind: "summary",
        scenarios,
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}

use prxbench_metrics::RunSnapshot;

use crate::config::ThresholdConfig;

/// One failed quality gate for a (scenario, endpoint) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdViolation {
    pub scenario: String,
    pub endpoint: String,
    /// Gate name, e.g. `min_success_rate`.
    pub gate: &'static str,
    pub limit: f64,
    pub observed: f64,
}

/// Evaluates the plan's quality gates against the final snapshot.
///
/// Endpoints with zero attempts (a scenario cancelled before they ran) are
/// skipped; gates never mutate the snapshot or the report body.
#[must_use]
pub fn evaluate_thresholds(
    snapshot: &RunSnapshot,
    thresholds: &ThresholdConfig,
) -> Vec<ThresholdViolation> {
    let mut violations = Vec::new();

    for scenario in &snapshot.scenarios {
        for e in &scenario.endpoints {
            if e.attempts == 0 {
                continue;
            }

            let mut violation = |gate: &'static str, limit: f64, observed: f64| {
                violations.push(ThresholdViolation {
                    scenario: scenario.scenario.clone(),
                    endpoint: e.endpoint.clone(),
                    gate,
                    limit,
                    observed,
                });
            };

            if let Some(min) = thresholds.min_success_rate
                && e.success_rate < min
            {
                violation("min_success_rate", min, e.success_rate);
            }
            if let Some(max) = thresholds.max_error_rate
                && e.error_rate > max
            {
                violation("max_error_rate", max, e.error_rate);
            }
            if let Some(max) = thresholds.max_timeout_rate
                && e.timeout_rate > max
            {
                violation("max_timeout_rate", max, e.timeout_rate);
            }
            if let Some(max) = thresholds.max_avg_response_time
                && e.avg_response_time > max.as_secs_f64()
            {
                violation("max_avg_response_time", max.as_secs_f64(), e.avg_response_time);
            }
        }
    }

    violations
}

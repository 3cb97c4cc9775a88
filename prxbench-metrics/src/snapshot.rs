use crate::reservoir::PercentileSummary;

/// Point-in-time, immutable view of the aggregator.
///
/// Scenarios are sorted by name, endpoints by name, proxies by id, so two
/// snapshots of identical state compare (and render) identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSnapshot {
    pub scenarios: Vec<ScenarioSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSnapshot {
    pub scenario: String,
    pub endpoints: Vec<EndpointSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSnapshot {
    pub endpoint: String,

    pub attempts: u64,
    pub successes: u64,
    pub errors: u64,
    pub timeouts: u64,

    pub success_rate: f64,
    pub error_rate: f64,
    pub timeout_rate: f64,

    /// Mean latency over successful attempts, seconds. Zero when there were
    /// no successes.
    pub avg_response_time: f64,

    /// Nearest-rank percentiles over successful latencies, microseconds.
    pub percentiles: PercentileSummary,
    pub latency_samples: u64,
    pub latency_truncated: bool,

    pub proxies: Vec<ProxySnapshot>,
    pub error_samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxySnapshot {
    pub proxy: String,

    pub attempts: u64,
    pub successes: u64,
    pub errors: u64,
    pub timeouts: u64,

    pub success_rate: f64,
    /// Mean latency over this proxy's successful attempts, seconds.
    pub avg_response_time: f64,
}

/// `part / total`, with `total == 0` reporting 0.0 rather than NaN.
#[must_use]
pub fn rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64
}

/// Mean of `sum_micros` over `count` samples, in seconds. Zero when empty.
#[must_use]
pub fn mean_seconds(sum_micros: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (sum_micros as f64 / count as f64) / 1e6
}

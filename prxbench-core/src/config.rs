use std::collections::HashSet;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pool::DEFAULT_MAX_CONSECUTIVE_FAILURES;

/// A proxy supplied to the pool: opaque stable id plus `host:port` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub id: String,
    pub addr: String,
}

/// A logical benchmark target and the request shape used to exercise it.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    pub method: http::Method,
    pub headers: Vec<(String, String)>,
    /// Status that counts as a success; anything else is an `HTTP <status>`
    /// error outcome.
    pub expected_status: u16,
}

impl EndpointConfig {
    #[must_use]
    pub fn get(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            method: http::Method::GET,
            headers: Vec::new(),
            expected_status: 200,
        }
    }
}

/// A named load level applied across a set of endpoints.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub name: String,
    /// Endpoint names to exercise; empty means every configured endpoint.
    pub endpoints: Vec<String>,
    /// Parallel workers per endpoint.
    pub concurrency: u64,
    /// Requests issued per endpoint.
    pub requests: u64,
    /// Per-request deadline.
    pub timeout: Duration,
    /// Optional pacing delay each worker sleeps between its iterations.
    pub delay: Option<Duration>,
}

/// Quality gates evaluated per (scenario, endpoint) against the final
/// snapshot. Rates are fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThresholdConfig {
    pub min_success_rate: Option<f64>,
    pub max_error_rate: Option<f64>,
    pub max_timeout_rate: Option<f64>,
    pub max_avg_response_time: Option<Duration>,
}

/// A complete benchmark plan. Immutable once loaded; the engine treats it
/// as read-only input.
#[derive(Debug, Clone)]
pub struct BenchPlan {
    pub proxies: Vec<ProxyConfig>,
    pub endpoints: Vec<EndpointConfig>,
    pub scenarios: Vec<ScenarioConfig>,
    pub thresholds: ThresholdConfig,
    /// Failure streak that permanently removes a proxy from rotation.
    pub max_consecutive_failures: u32,
}

impl Default for BenchPlan {
    fn default() -> Self {
        Self {
            proxies: Vec::new(),
            endpoints: Vec::new(),
            scenarios: Vec::new(),
            thresholds: ThresholdConfig::default(),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl BenchPlan {
    /// Checks everything that must hold before the first request is issued.
    ///
    /// An empty proxy list is deliberately legal: it is the total-exhaustion
    /// case, which must produce a report, not an abort.
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        if self.scenarios.is_empty() {
            return Err(Error::NoScenarios);
        }
        if self.max_consecutive_failures < 2 {
            return Err(Error::InvalidFailureThreshold);
        }

        let mut proxy_ids = HashSet::new();
        for p in &self.proxies {
            if !proxy_ids.insert(p.id.as_str()) {
                return Err(Error::DuplicateProxyId(p.id.clone()));
            }
        }

        let mut endpoint_names = HashSet::new();
        for e in &self.endpoints {
            if !endpoint_names.insert(e.name.as_str()) {
                return Err(Error::DuplicateEndpoint(e.name.clone()));
            }
            let parsed = url::Url::parse(&e.url).map_err(|err| Error::InvalidEndpointUrl {
                url: e.url.clone(),
                reason: err.to_string(),
            })?;
            if parsed.scheme() != "http" {
                return Err(Error::InvalidEndpointUrl {
                    url: e.url.clone(),
                    reason: "only http:// URLs can be routed through a proxy".to_string(),
                });
            }
        }

        let mut scenario_names = HashSet::new();
        for s in &self.scenarios {
            if !scenario_names.insert(s.name.as_str()) {
                return Err(Error::DuplicateScenario(s.name.clone()));
            }
            if s.concurrency == 0 {
                return Err(Error::InvalidConcurrency(s.name.clone()));
            }
            if s.requests == 0 {
                return Err(Error::InvalidRequests(s.name.clone()));
            }
            if s.timeout.is_zero() {
                return Err(Error::InvalidTimeout(s.name.clone()));
            }
            for name in &s.endpoints {
                if !endpoint_names.contains(name.as_str()) {
                    return Err(Error::UnknownEndpoint {
                        scenario: s.name.clone(),
                        endpoint: name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Resolves a scenario's endpoint names to configs, preserving plan
    /// order. An empty selection means every endpoint.
    #[must_use]
    pub fn scenario_endpoints(&self, scenario: &ScenarioConfig) -> Vec<&EndpointConfig> {
        if scenario.endpoints.is_empty() {
            return self.endpoints.iter().collect();
        }
        self.endpoints
            .iter()
            .filter(|e| scenario.endpoints.iter().any(|n| n == &e.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> BenchPlan {
        BenchPlan {
            proxies: vec![ProxyConfig {
                id: "p1".to_string(),
                addr: "127.0.0.1:9000".to_string(),
            }],
            endpoints: vec![EndpointConfig::get("latency", "http://127.0.0.1:8080/slow")],
            scenarios: vec![ScenarioConfig {
                name: "light_load".to_string(),
                endpoints: Vec::new(),
                concurrency: 5,
                requests: 10,
                timeout: Duration::from_secs(10),
                delay: None,
            }],
            ..BenchPlan::default()
        }
    }

    #[test]
    fn valid_plan_passes() {
        assert!(plan().validate().is_ok());
    }

    #[test]
    fn empty_proxy_list_is_legal() {
        let mut p = plan();
        p.proxies.clear();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn empty_endpoints_are_fatal() {
        let mut p = plan();
        p.endpoints.clear();
        assert!(matches!(p.validate(), Err(Error::NoEndpoints)));
    }

    #[test]
    fn unknown_endpoint_reference_is_fatal() {
        let mut p = plan();
        p.scenarios[0].endpoints = vec!["cpu".to_string()];
        assert!(matches!(
            p.validate(),
            Err(Error::UnknownEndpoint { .. })
        ));
    }

    #[test]
    fn duplicate_proxy_id_is_fatal() {
        let mut p = plan();
        p.proxies.push(ProxyConfig {
            id: "p1".to_string(),
            addr: "127.0.0.1:9001".to_string(),
        });
        assert!(matches!(p.validate(), Err(Error::DuplicateProxyId(_))));
    }

    #[test]
    fn zero_concurrency_is_fatal() {
        let mut p = plan();
        p.scenarios[0].concurrency = 0;
        assert!(matches!(p.validate(), Err(Error::InvalidConcurrency(_))));
    }

    #[test]
    fn https_endpoint_is_rejected() {
        let mut p = plan();
        p.endpoints[0].url = "https://example.com/".to_string();
        assert!(matches!(
            p.validate(),
            Err(Error::InvalidEndpointUrl { .. })
        ));
    }

    #[test]
    fn empty_selection_resolves_to_all_endpoints() {
        let p = plan();
        let targets = p.scenario_endpoints(&p.scenarios[0]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "latency");
    }
}

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_EXPECTED_STATUS: u16 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlanYaml {
    /// Pre-supplied proxy identities. Empty is legal: it is the
    /// total-exhaustion case.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<ProxyYaml>,

    pub endpoints: Vec<EndpointYaml>,
    pub scenarios: Vec<ScenarioYaml>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdsYaml>,

    /// Failure streak that retires a proxy for the rest of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProxyYaml {
    pub id: String,
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EndpointYaml {
    pub name: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScenarioYaml {
    pub name: String,

    /// Endpoint names to exercise; empty means every configured endpoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<String>,

    pub concurrency: u64,
    pub requests: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<YamlDuration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<YamlDuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThresholdsYaml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_success_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_error_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_avg_response_time: Option<YamlDuration>,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl From<Duration> for YamlDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Serialize for YamlDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl<'de> serde::de::Visitor<'de> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v <= 0 {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(Duration::from_secs(v as u64)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v <= 0.0 {
                    return Err(E::custom("duration must be a positive, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_any(V)
    }
}

pub async fn load_plan_from_yaml(path: &Path) -> anyhow::Result<prxbench_core::BenchPlan> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read benchmark plan: {}", path.display()))?;

    let doc: PlanYaml = serde_yaml::from_slice(&bytes)
        .with_context(|| format!("failed to parse YAML: {}", path.display()))?;

    plan_yaml_into_plan(doc)
}

fn plan_yaml_into_plan(doc: PlanYaml) -> anyhow::Result<prxbench_core::BenchPlan> {
    let proxies = doc
        .proxies
        .into_iter()
        .map(|p| prxbench_core::ProxyConfig {
            id: p.id,
            addr: p.addr,
        })
        .collect();

    let endpoints = doc
        .endpoints
        .into_iter()
        .map(|e| {
            let method = match &e.method {
                Some(m) => m
                    .parse::<http::Method>()
                    .map_err(|_| anyhow::anyhow!("invalid method `{m}` for endpoint `{}`", e.name))?,
                None => http::Method::GET,
            };

            Ok(prxbench_core::EndpointConfig {
                name: e.name,
                url: e.url,
                method,
                headers: e.headers.into_iter().collect(),
                expected_status: e.expected_status.unwrap_or(DEFAULT_EXPECTED_STATUS),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let scenarios = doc
        .scenarios
        .into_iter()
        .map(|s| prxbench_core::ScenarioConfig {
            name: s.name,
            endpoints: s.endpoints,
            concurrency: s.concurrency,
            requests: s.requests,
            timeout: s.timeout.map_or(DEFAULT_TIMEOUT, YamlDuration::into_inner),
            delay: s.delay.map(YamlDuration::into_inner),
        })
        .collect();

    let thresholds = doc
        .thresholds
        .map(|t| prxbench_core::ThresholdConfig {
            min_success_rate: t.min_success_rate,
            max_error_rate: t.max_error_rate,
            max_timeout_rate: t.max_timeout_rate,
            max_avg_response_time: t.max_avg_response_time.map(YamlDuration::into_inner),
        })
        .unwrap_or_default();

    Ok(prxbench_core::BenchPlan {
        proxies,
        endpoints,
        scenarios,
        thresholds,
        max_consecutive_failures: doc
            .max_consecutive_failures
            .unwrap_or(prxbench_core::DEFAULT_MAX_CONSECUTIVE_FAILURES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> anyhow::Result<prxbench_core::BenchPlan> {
        let doc: PlanYaml = serde_yaml::from_str(yaml)?;
        plan_yaml_into_plan(doc)
    }

    #[test]
    fn parses_a_full_plan() {
        let plan = parse(
            r#"
proxies:
  - id: p1
    addr: 127.0.0.1:9001
  - id: p2
    addr: 127.0.0.1:9002
endpoints:
  - name: latency
    url: http://127.0.0.1:8080/slow?ms=1000
  - name: bandwidth
    url: http://127.0.0.1:8080/bytes/50000
    expectedStatus: 200
scenarios:
  - name: light_load
    concurrency: 5
    requests: 10
    timeout: 10s
    delay: 1s
  - name: heavy_load
    endpoints: [latency]
    concurrency: 50
    requests: 100
    timeout: 20s
thresholds:
  minSuccessRate: 0.95
  maxErrorRate: 0.05
  maxTimeoutRate: 0.03
  maxAvgResponseTime: 5s
maxConsecutiveFailures: 10
"#,
        )
        .unwrap_or_else(|e| panic!("{e:#}"));

        assert_eq!(plan.proxies.len(), 2);
        assert_eq!(plan.endpoints.len(), 2);
        assert_eq!(plan.scenarios.len(), 2);
        assert_eq!(plan.scenarios[0].timeout, Duration::from_secs(10));
        assert_eq!(plan.scenarios[0].delay, Some(Duration::from_secs(1)));
        assert_eq!(plan.scenarios[1].endpoints, vec!["latency".to_string()]);
        assert_eq!(plan.thresholds.min_success_rate, Some(0.95));
        assert_eq!(
            plan.thresholds.max_avg_response_time,
            Some(Duration::from_secs(5))
        );
        assert_eq!(plan.max_consecutive_failures, 10);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn minimal_plan_gets_defaults() {
        let plan = parse(
            r#"
endpoints:
  - name: latency
    url: http://127.0.0.1:8080/plaintext
scenarios:
  - name: smoke
    concurrency: 1
    requests: 1
"#,
        )
        .unwrap_or_else(|e| panic!("{e:#}"));

        assert!(plan.proxies.is_empty());
        assert_eq!(plan.endpoints[0].method, http::Method::GET);
        assert_eq!(plan.endpoints[0].expected_status, 200);
        assert_eq!(plan.scenarios[0].timeout, DEFAULT_TIMEOUT);
        assert_eq!(plan.scenarios[0].delay, None);
        assert_eq!(
            plan.max_consecutive_failures,
            prxbench_core::DEFAULT_MAX_CONSECUTIVE_FAILURES
        );
        assert_eq!(plan.thresholds, prxbench_core::ThresholdConfig::default());
    }

    #[test]
    fn duration_accepts_bare_seconds() {
        let plan = parse(
            r#"
endpoints:
  - name: latency
    url: http://127.0.0.1:8080/plaintext
scenarios:
  - name: smoke
    concurrency: 1
    requests: 1
    timeout: 15
"#,
        )
        .unwrap_or_else(|e| panic!("{e:#}"));

        assert_eq!(plan.scenarios[0].timeout, Duration::from_secs(15));
    }

    #[test]
    fn invalid_method_is_rejected() {
        let result = parse(
            r#"
endpoints:
  - name: latency
    url: http://127.0.0.1:8080/plaintext
    method: "GE T"
scenarios:
  - name: smoke
    concurrency: 1
    requests: 1
"#,
        );
        assert!(result.is_err());
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use prxbench_metrics::{Outcome, RequestRecord};

use crate::client::{HttpRequest, ProxyHttpClient};
use crate::config::EndpointConfig;
use crate::pool::ProxyPool;

/// Endpoint identity shared across workers without re-allocating per record.
#[derive(Debug, Clone)]
pub struct EndpointTarget {
    pub name: Arc<str>,
    pub config: EndpointConfig,
}

impl EndpointTarget {
    #[must_use]
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            name: Arc::from(config.name.as_str()),
            config,
        }
    }
}

/// Issues one instrumented request through a checked-out proxy.
///
/// Single-attempt semantics: this component never retries. Retries, if ever
/// wanted, are a driver policy, which keeps per-attempt measurement clean.
#[derive(Debug)]
pub struct RequestExecutor {
    pool: ProxyPool,
    client: ProxyHttpClient,
    timeout: Duration,
}

impl RequestExecutor {
    #[must_use]
    pub fn new(pool: ProxyPool, client: ProxyHttpClient, timeout: Duration) -> Self {
        Self {
            pool,
            client,
            timeout,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &ProxyPool {
        &self.pool
    }

    /// Runs one attempt against `target` and returns its record.
    ///
    /// Checkout failure short-circuits without any network I/O; every other
    /// path measures wall-clock elapsed time and releases the proxy lease
    /// before the record leaves this function.
    pub async fn execute(&self, scenario: &Arc<str>, target: &EndpointTarget) -> RequestRecord {
        let started_at = SystemTime::now();

        let mut lease = match self.pool.checkout() {
            Ok(lease) => lease,
            Err(exhausted) => {
                // Fail fast: exhaustion is an attempt failure, not a wait.
                return RequestRecord {
                    scenario: scenario.clone(),
                    endpoint: target.name.clone(),
                    proxy: None,
                    started_at,
                    elapsed: Duration::ZERO,
                    outcome: Outcome::Error(exhausted.to_string()),
                };
            }
        };

        let req = endpoint_request(&target.config, self.timeout);
        let start = Instant::now();
        let result = self.client.request_via(lease.proxy().addr.as_ref(), req).await;
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(res) if res.status == target.config.expected_status => {
                lease.report_success();
                Outcome::Success
            }
            Ok(res) => {
                lease.report_failure();
                Outcome::Error(format!("HTTP {}", res.status))
            }
            Err(err) if err.is_deadline() => {
                // A single timeout does not condemn the proxy outright; it
                // extends the failure streak like any other failed attempt.
                lease.report_failure();
                Outcome::Timeout
            }
            Err(err) => {
                lease.report_failure();
                Outcome::Error(err.to_string())
            }
        };

        let proxy = Some(lease.proxy().id.clone());
        drop(lease);

        RequestRecord {
            scenario: scenario.clone(),
            endpoint: target.name.clone(),
            proxy,
            started_at,
            elapsed,
            outcome,
        }
    }
}

fn endpoint_request(endpoint: &EndpointConfig, timeout: Duration) -> HttpRequest {
    HttpRequest {
        method: endpoint.method.clone(),
        url: endpoint.url.clone(),
        headers: endpoint.headers.clone(),
        body: bytes::Bytes::new(),
        timeout: Some(timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{DEFAULT_MAX_CONSECUTIVE_FAILURES, Proxy};
    use prxbench_testserver::{ForwardProxy, TestServer};

    fn target(url: &str) -> EndpointTarget {
        EndpointTarget::new(EndpointConfig::get("latency", url))
    }

    fn scenario() -> Arc<str> {
        Arc::from("light_load")
    }

    fn pool_of(proxies: Vec<Proxy>) -> ProxyPool {
        ProxyPool::new(proxies, DEFAULT_MAX_CONSECUTIVE_FAILURES)
    }

    #[tokio::test]
    async fn empty_pool_yields_no_proxy_available_without_io() {
        let executor = RequestExecutor::new(
            pool_of(Vec::new()),
            ProxyHttpClient::default(),
            Duration::from_secs(1),
        );

        let record = executor.execute(&scenario(), &target("http://127.0.0.1:1/")).await;

        assert_eq!(record.proxy, None);
        assert_eq!(record.elapsed, Duration::ZERO);
        assert_eq!(
            record.outcome,
            Outcome::Error("No proxy available".to_string())
        );
    }

    #[tokio::test]
    async fn success_through_a_local_proxy() {
        let server = match TestServer::start().await {
            Ok(s) => s,
            Err(err) => panic!("start test server: {err:#}"),
        };
        let proxy = match ForwardProxy::start().await {
            Ok(p) => p,
            Err(err) => panic!("start forward proxy: {err:#}"),
        };

        let pool = pool_of(vec![Proxy {
            id: Arc::from("p1"),
            addr: Arc::from(proxy.addr().to_string().as_str()),
        }]);
        let executor =
            RequestExecutor::new(pool.clone(), ProxyHttpClient::default(), Duration::from_secs(5));

        let url = format!("{}/plaintext", server.base_url());
        let record = executor.execute(&scenario(), &target(&url)).await;

        assert_eq!(record.outcome, Outcome::Success);
        assert_eq!(record.proxy.as_deref(), Some("p1"));
        assert!(record.elapsed > Duration::ZERO);
        assert_eq!(pool.stats().available, 1);
        assert_eq!(proxy.forwarded_total(), 1);

        proxy.shutdown().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn unexpected_status_is_an_http_error_outcome() {
        let server = match TestServer::start().await {
            Ok(s) => s,
            Err(err) => panic!("start test server: {err:#}"),
        };
        let proxy = match ForwardProxy::start().await {
            Ok(p) => p,
            Err(err) => panic!("start forward proxy: {err:#}"),
        };

        let pool = pool_of(vec![Proxy {
            id: Arc::from("p1"),
            addr: Arc::from(proxy.addr().to_string().as_str()),
        }]);
        let executor =
            RequestExecutor::new(pool, ProxyHttpClient::default(), Duration::from_secs(5));

        let url = format!("{}/status/503", server.base_url());
        let record = executor.execute(&scenario(), &target(&url)).await;

        assert_eq!(record.outcome, Outcome::Error("HTTP 503".to_string()));

        proxy.shutdown().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn deadline_exceeded_is_a_timeout_and_the_proxy_comes_back() {
        let server = match TestServer::start().await {
            Ok(s) => s,
            Err(err) => panic!("start test server: {err:#}"),
        };
        let proxy = match ForwardProxy::start().await {
            Ok(p) => p,
            Err(err) => panic!("start forward proxy: {err:#}"),
        };

        let pool = pool_of(vec![Proxy {
            id: Arc::from("p1"),
            addr: Arc::from(proxy.addr().to_string().as_str()),
        }]);
        let executor = RequestExecutor::new(
            pool.clone(),
            ProxyHttpClient::default(),
            Duration::from_millis(50),
        );

        let url = format!("{}/slow?ms=2000", server.base_url());
        let record = executor.execute(&scenario(), &target(&url)).await;

        assert_eq!(record.outcome, Outcome::Timeout);
        assert_eq!(record.proxy.as_deref(), Some("p1"));
        assert_eq!(pool.stats().available, 1);
        assert_eq!(pool.stats().in_use, 0);

        proxy.shutdown().await;
        server.shutdown().await;
    }
}

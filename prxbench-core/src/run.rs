use std::sync::Arc;

use prxbench_metrics::{MetricsAggregator, RunSnapshot};

use crate::client::ProxyHttpClient;
use crate::config::BenchPlan;
use crate::driver::ScenarioDriver;
use crate::error::Result;
use crate::executor::{EndpointTarget, RequestExecutor};
use crate::gate::CancelToken;
use crate::pool::{Proxy, ProxyPool};
use crate::progress::{ProgressFn, ProgressUpdate};

/// Runs every scenario in the plan, in plan order, and returns the final
/// aggregated snapshot.
///
/// Only configuration-level problems abort the run; per-request failures
/// flow into the snapshot as data. Cancelling the token stops claiming new
/// iterations but still drains in-flight requests into the snapshot.
pub async fn run_benchmark(
    plan: &BenchPlan,
    progress: Option<ProgressFn>,
    cancel: CancelToken,
) -> Result<RunSnapshot> {
    plan.validate()?;

    let aggregator = MetricsAggregator::default();
    let client = ProxyHttpClient::default();

    for scenario in &plan.scenarios {
        if cancel.is_cancelled() {
            break;
        }

        // Pool membership is fixed at scenario start and never grows with
        // demand; scenarios that outrun the pool surface that as checkout
        // failures, which is exactly what the benchmark measures.
        let pool = ProxyPool::new(
            plan.proxies.iter().map(|p| Proxy {
                id: Arc::from(p.id.as_str()),
                addr: Arc::from(p.addr.as_str()),
            }),
            plan.max_consecutive_failures,
        );

        let executor = Arc::new(RequestExecutor::new(pool, client.clone(), scenario.timeout));
        let driver = ScenarioDriver::new(executor);

        let targets: Vec<EndpointTarget> = plan
            .scenario_endpoints(scenario)
            .into_iter()
            .map(|cfg| EndpointTarget::new(cfg.clone()))
            .collect();
        let total = scenario.requests.saturating_mul(targets.len() as u64);
        let scenario_label: Arc<str> = Arc::from(scenario.name.as_str());

        let mut rx = driver.run(scenario, targets, cancel.clone());
        let mut completed = 0u64;
        let mut failures = 0u64;
        while let Some(record) = rx.recv().await {
            completed += 1;
            if !record.outcome.is_success() {
                failures += 1;
            }
            if let Some(progress) = &progress {
                progress(ProgressUpdate {
                    scenario: scenario_label.clone(),
                    completed,
                    total,
                    failures,
                });
            }
            aggregator.ingest(record);
        }
    }

    Ok(aggregator.snapshot())
}

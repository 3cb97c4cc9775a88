use std::sync::Arc;

use tokio::sync::mpsc;

use prxbench_metrics::RequestRecord;

use crate::config::ScenarioConfig;
use crate::executor::{EndpointTarget, RequestExecutor};
use crate::gate::{CancelToken, IterationGate};

/// Backpressure bound on the record stream; workers pause when the
/// consumer falls this far behind.
pub const RECORD_CHANNEL_CAPACITY: usize = 1024;

/// Expands one scenario into a finite, one-shot stream of completed
/// request records.
///
/// Per endpoint, `concurrency` workers claim iterations from a shared gate
/// and emit each record as its request completes, so completion order is
/// not request order and must not be relied on downstream.
#[derive(Debug)]
pub struct ScenarioDriver {
    executor: Arc<RequestExecutor>,
}

impl ScenarioDriver {
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Starts the scenario and returns its record stream. The stream ends
    /// when every endpoint has run its configured requests or the token is
    /// cancelled; either way, in-flight requests finish first.
    pub fn run(
        &self,
        scenario: &ScenarioConfig,
        targets: Vec<EndpointTarget>,
        cancel: CancelToken,
    ) -> mpsc::Receiver<RequestRecord> {
        let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);

        let executor = self.executor.clone();
        let scenario_name: Arc<str> = Arc::from(scenario.name.as_str());
        let concurrency = scenario.concurrency;
        let requests = scenario.requests;
        let delay = scenario.delay;

        tokio::spawn(async move {
            // Endpoints run one after another; records carry their own
            // (scenario, endpoint) key either way.
            for target in targets {
                if cancel.is_cancelled() {
                    break;
                }

                let gate = Arc::new(IterationGate::new(requests, cancel.clone()));
                let workers: Vec<_> = (0..concurrency)
                    .map(|_| {
                        let gate = gate.clone();
                        let tx = tx.clone();
                        let executor = executor.clone();
                        let scenario_name = scenario_name.clone();
                        let target = target.clone();
                        tokio::spawn(async move {
                            while gate.next() {
                                let record = executor.execute(&scenario_name, &target).await;
                                if tx.send(record).await.is_err() {
                                    break;
                                }
                                if let Some(delay) = delay {
                                    tokio::time::sleep(delay).await;
                                }
                            }
                        })
                    })
                    .collect();

                for worker in workers {
                    let _ = worker.await;
                }
            }
        });

        rx
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::record::{Outcome, RequestRecord};
use crate::reservoir::LatencyReservoir;
use crate::snapshot::{
    EndpointSnapshot, ProxySnapshot, RunSnapshot, ScenarioSnapshot, mean_seconds, rate,
};

/// Representative error messages retained per endpoint. Everything past the
/// cap is counted but not stored, which bounds memory under failure storms.
pub const MAX_ERROR_SAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    scenario: Arc<str>,
    endpoint: Arc<str>,
}

#[derive(Debug, Default)]
struct OutcomeCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    /// Sum of successful-attempt latencies, microseconds.
    success_elapsed_us: AtomicU64,
}

impl OutcomeCounters {
    fn record(&self, outcome: &Outcome, elapsed_us: u64) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Outcome::Success => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                self.success_elapsed_us
                    .fetch_add(elapsed_us, Ordering::Relaxed);
            }
            Outcome::Error(_) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Timeout => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[derive(Debug, Default)]
struct EndpointSeries {
    counters: OutcomeCounters,
    latency: Mutex<LatencyReservoir>,
    error_samples: Mutex<SmallVec<[String; MAX_ERROR_SAMPLES]>>,
    proxies: DashMap<Arc<str>, OutcomeCounters, ahash::RandomState>,
}

/// Running per-endpoint and per-proxy statistics over the record stream.
///
/// `ingest` is safe under concurrent callers: counters are relaxed atomics,
/// the latency reservoir and error-sample buffer sit behind short mutexes,
/// and every reduction is commutative, so ingestion order never changes the
/// final snapshot.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    series: DashMap<SeriesKey, Arc<EndpointSeries>, ahash::RandomState>,
}

impl MetricsAggregator {
    /// Folds one completed attempt into the running aggregates. Consumes
    /// the record; only derived statistics are retained.
    pub fn ingest(&self, record: RequestRecord) {
        let key = SeriesKey {
            scenario: record.scenario.clone(),
            endpoint: record.endpoint.clone(),
        };
        let series = self.series.entry(key).or_default().clone();

        let elapsed_us = u64::try_from(record.elapsed.as_micros()).unwrap_or(u64::MAX);
        series.counters.record(&record.outcome, elapsed_us);

        if let Some(proxy) = &record.proxy {
            series
                .proxies
                .entry(proxy.clone())
                .or_default()
                .record(&record.outcome, elapsed_us);
        }

        match record.outcome {
            Outcome::Success => {
                series.latency.lock().record(elapsed_us);
            }
            Outcome::Error(reason) => {
                let mut samples = series.error_samples.lock();
                if samples.len() < MAX_ERROR_SAMPLES && !samples.contains(&reason) {
                    samples.push(reason);
                }
            }
            Outcome::Timeout => {}
        }
    }

    /// Freezes the current state into a deterministic, immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        let mut by_scenario: BTreeMap<String, Vec<EndpointSnapshot>> = BTreeMap::new();

        for entry in self.series.iter() {
            let key = entry.key();
            let series = entry.value();
            by_scenario
                .entry(key.scenario.to_string())
                .or_default()
                .push(snapshot_endpoint(&key.endpoint, series));
        }

        let scenarios = by_scenario
            .into_iter()
            .map(|(scenario, mut endpoints)| {
                endpoints.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
                ScenarioSnapshot {
                    scenario,
                    endpoints,
                }
            })
            .collect();

        RunSnapshot { scenarios }
    }
}

fn snapshot_endpoint(endpoint: &str, series: &EndpointSeries) -> EndpointSnapshot {
    let attempts = series.counters.attempts.load(Ordering::Relaxed);
    let successes = series.counters.successes.load(Ordering::Relaxed);
    let errors = series.counters.errors.load(Ordering::Relaxed);
    let timeouts = series.counters.timeouts.load(Ordering::Relaxed);
    let success_elapsed_us = series.counters.success_elapsed_us.load(Ordering::Relaxed);

    let (percentiles, latency_samples, latency_truncated) = {
        let latency = series.latency.lock();
        (
            latency.percentiles(),
            latency.len() as u64,
            latency.is_truncated(),
        )
    };

    let mut proxies: Vec<ProxySnapshot> = series
        .proxies
        .iter()
        .map(|p| {
            let c = p.value();
            let p_attempts = c.attempts.load(Ordering::Relaxed);
            let p_successes = c.successes.load(Ordering::Relaxed);
            ProxySnapshot {
                proxy: p.key().to_string(),
                attempts: p_attempts,
                successes: p_successes,
                errors: c.errors.load(Ordering::Relaxed),
                timeouts: c.timeouts.load(Ordering::Relaxed),
                success_rate: rate(p_successes, p_attempts),
                avg_response_time: mean_seconds(
                    c.success_elapsed_us.load(Ordering::Relaxed),
                    p_successes,
                ),
            }
        })
        .collect();
    proxies.sort_by(|a, b| a.proxy.cmp(&b.proxy));

    EndpointSnapshot {
        endpoint: endpoint.to_string(),
        attempts,
        successes,
        errors,
        timeouts,
        success_rate: rate(successes, attempts),
        error_rate: rate(errors, attempts),
        timeout_rate: rate(timeouts, attempts),
        avg_response_time: mean_seconds(success_elapsed_us, successes),
        percentiles,
        latency_samples,
        latency_truncated,
        proxies,
        error_samples: series.error_samples.lock().to_vec(),
    }
}

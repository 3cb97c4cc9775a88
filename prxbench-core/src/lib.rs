#![forbid(unsafe_code)]

mod client;
mod config;
mod driver;
mod error;
mod executor;
mod gate;
mod pool;
mod progress;
mod report;
mod run;
mod thresholds;

pub use client::{
    Error as ClientError, HttpRequest, HttpResponse, ProxyHttpClient, TransportErrorKind,
};
pub use config::{BenchPlan, EndpointConfig, ProxyConfig, ScenarioConfig, ThresholdConfig};
pub use driver::{RECORD_CHANNEL_CAPACITY, ScenarioDriver};
pub use error::{Error, Result};
pub use executor::{EndpointTarget, RequestExecutor};
pub use gate::{CancelToken, IterationGate};
pub use pool::{
    DEFAULT_MAX_CONSECUTIVE_FAILURES, PoolExhausted, PoolStats, Proxy, ProxyLease, ProxyPool,
    ProxyState,
};
pub use progress::{ProgressFn, ProgressUpdate};
pub use report::render;
pub use run::run_benchmark;
pub use thresholds::{ThresholdViolation, evaluate_thresholds};

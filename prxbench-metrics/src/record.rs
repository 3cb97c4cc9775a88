use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Terminal outcome of one request attempt.
///
/// Failures are data, not control flow: a failing attempt is recorded and
/// aggregated, never propagated as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Application or transport failure, with the reason kept verbatim.
    Error(String),
    /// The per-request deadline elapsed. Distinct rate bucket from `Error`.
    Timeout,
}

impl Outcome {
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success => OutcomeKind::Success,
            Self::Error(_) => OutcomeKind::Error,
            Self::Timeout => OutcomeKind::Timeout,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Outcome class without the error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Error,
    Timeout,
}

/// One completed request attempt.
///
/// Produced by the request executor, consumed exactly once by
/// [`crate::MetricsAggregator::ingest`]. The aggregator keeps only derived
/// statistics, so records are discardable after ingestion.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub scenario: Arc<str>,
    pub endpoint: Arc<str>,
    /// Proxy that carried the attempt; `None` when checkout failed before
    /// any network I/O.
    pub proxy: Option<Arc<str>>,
    pub started_at: SystemTime,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl RequestRecord {
    #[must_use]
    pub fn ended_at(&self) -> SystemTime {
        self.started_at + self.elapsed
    }
}

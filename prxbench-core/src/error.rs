pub type Result<T> = std::result::Result<T, Error>;

/// Fatal configuration-level errors.
///
/// Per-request failures are never surfaced here; they are recorded as
/// outcomes and aggregated. Only a plan that cannot produce a meaningful
/// run aborts before the first request is issued.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("a benchmark plan must define at least one endpoint")]
    NoEndpoints,

    #[error("a benchmark plan must define at least one scenario")]
    NoScenarios,

    #[error("`concurrency` must be a positive integer (scenario `{0}`)")]
    InvalidConcurrency(String),

    #[error("`requests` must be a positive integer (scenario `{0}`)")]
    InvalidRequests(String),

    #[error("`timeout` must be a positive duration (scenario `{0}`)")]
    InvalidTimeout(String),

    #[error("scenario `{scenario}` references unknown endpoint `{endpoint}`")]
    UnknownEndpoint { scenario: String, endpoint: String },

    #[error("duplicate proxy id `{0}`")]
    DuplicateProxyId(String),

    #[error("duplicate endpoint name `{0}`")]
    DuplicateEndpoint(String),

    #[error("duplicate scenario name `{0}`")]
    DuplicateScenario(String),

    #[error("invalid endpoint url `{url}` ({reason})")]
    InvalidEndpointUrl { url: String, reason: String },

    #[error("`max_consecutive_failures` must be at least 2")]
    InvalidFailureThreshold,
}

pub mod agg;
pub mod record;
pub mod reservoir;
pub mod snapshot;

pub use agg::{MAX_ERROR_SAMPLES, MetricsAggregator};
pub use record::{Outcome, OutcomeKind, RequestRecord};
pub use reservoir::{DEFAULT_RESERVOIR_CAPACITY, LatencyReservoir, PercentileSummary};
pub use snapshot::{EndpointSnapshot, ProxySnapshot, RunSnapshot, ScenarioSnapshot};

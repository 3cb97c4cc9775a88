use std::sync::Arc;

/// Callback invoked after every completed attempt of a run.
pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub scenario: Arc<str>,
    /// Attempts completed so far in this scenario.
    pub completed: u64,
    /// Attempts this scenario will issue in total.
    pub total: u64,
    /// Non-success attempts so far (errors + timeouts).
    pub failures: u64,
}

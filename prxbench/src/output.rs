use std::path::Path;

use prxbench_core::{BenchPlan, ProgressFn, ThresholdViolation};
use prxbench_metrics::RunSnapshot;

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, plan_path: &Path, plan: &BenchPlan);
    fn progress(&self) -> Option<ProgressFn>;
    fn print_summary(&self, snapshot: &RunSnapshot) -> anyhow::Result<()>;
    fn print_violations(&self, violations: &[ThresholdViolation]);
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}

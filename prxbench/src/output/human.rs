use std::sync::Arc;

mod progress;

use progress::HumanProgress;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, plan_path: &std::path::Path, plan: &prxbench_core::BenchPlan) {
        println!("plan: {}", plan_path.display());
        println!(
            "proxies: {} endpoints: {}",
            plan.proxies.len(),
            plan.endpoints.len()
        );
        for s in &plan.scenarios {
            let endpoints = if s.endpoints.is_empty() {
                "all".to_string()
            } else {
                s.endpoints.join(",")
            };
            println!(
                "scenario: {} endpoints={endpoints} concurrency={} requests={} timeout={:?}",
                s.name, s.concurrency, s.requests, s.timeout
            );
        }
        println!();
    }

    fn progress(&self) -> Option<prxbench_core::ProgressFn> {
        let progress = self.progress.clone();
        Some(Arc::new(move |u| {
            progress.update(&u);
        }))
    }

    fn print_summary(&self, snapshot: &prxbench_metrics::RunSnapshot) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", prxbench_core::render(snapshot));
        Ok(())
    }

    fn print_violations(&self, violations: &[prxbench_core::ThresholdViolation]) {
        if violations.is_empty() {
            return;
        }

        eprintln!("thresholds failed:");
        for v in violations {
            eprintln!(
                "  {}/{}: {} {} (observed {:.4})",
                v.scenario, v.endpoint, v.gate, v.limit, v.observed
            );
        }
    }
}

use std::path::Path;

use anyhow::Context as _;

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::plan_yaml;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let mut plan = plan_yaml::load_plan_from_yaml(&args.plan)
        .await
        .map_err(RunError::InvalidInput)?;

    apply_overrides(&mut plan, &args).map_err(RunError::InvalidInput)?;
    plan.validate()
        .map_err(|err| RunError::InvalidInput(err.into()))?;

    let formatter = output::formatter(args.output);
    formatter.print_header(&args.plan, &plan);

    let cancel = prxbench_core::CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let snapshot = prxbench_core::run_benchmark(&plan, formatter.progress(), cancel)
        .await
        .map_err(|err| RunError::RuntimeError(err.into()))?;

    formatter
        .print_summary(&snapshot)
        .map_err(RunError::RuntimeError)?;

    if let Some(path) = &args.report_file {
        write_report_file(path, &snapshot)
            .await
            .map_err(RunError::RuntimeError)?;
    }

    let violations = prxbench_core::evaluate_thresholds(&snapshot, &plan.thresholds);
    formatter.print_violations(&violations);

    Ok(ExitCode::from_quality_gates(!violations.is_empty()))
}

fn apply_overrides(plan: &mut prxbench_core::BenchPlan, args: &RunArgs) -> anyhow::Result<()> {
    if !args.scenarios.is_empty() {
        for name in &args.scenarios {
            if !plan.scenarios.iter().any(|s| &s.name == name) {
                let known = plan
                    .scenarios
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow::bail!("unknown scenario `{name}` (plan defines: {known})");
            }
        }
        plan.scenarios
            .retain(|s| args.scenarios.iter().any(|n| n == &s.name));
    }

    for s in &mut plan.scenarios {
        if let Some(concurrency) = args.concurrency {
            s.concurrency = concurrency;
        }
        if let Some(requests) = args.requests {
            s.requests = requests;
        }
        if let Some(timeout) = args.timeout {
            s.timeout = timeout;
        }
    }

    Ok(())
}

async fn write_report_file(
    path: &Path,
    snapshot: &prxbench_metrics::RunSnapshot,
) -> anyhow::Result<()> {
    let report = prxbench_core::render(snapshot);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    tokio::fs::write(path, report)
        .await
        .with_context(|| format!("failed to write report: {}", path.display()))?;

    Ok(())
}

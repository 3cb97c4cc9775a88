use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::Context as _;

const EXIT_THRESHOLDS_FAILED: i32 = 11;
const EXIT_INVALID_INPUT: i32 = 30;

fn write_plan(dir: &tempfile::TempDir, yaml: &str) -> anyhow::Result<PathBuf> {
    let path = dir.path().join("bench.yaml");
    std::fs::write(&path, yaml).context("write plan")?;
    Ok(path)
}

async fn run_prxbench(args: Vec<String>) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_prxbench");
    tokio::task::spawn_blocking(move || Command::new(exe).args(&args).output())
        .await
        .context("spawn_blocking join")?
        .context("run prxbench binary")
}

#[tokio::test]
async fn missing_plan_file_is_invalid_input() -> anyhow::Result<()> {
    let output = run_prxbench(vec![
        "run".to_string(),
        "does-not-exist.yaml".to_string(),
    ])
    .await?;

    assert_eq!(output.status.code(), Some(EXIT_INVALID_INPUT));
    Ok(())
}

#[tokio::test]
async fn plan_without_endpoints_is_invalid_input() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let plan = write_plan(
        &dir,
        r#"
endpoints: []
scenarios:
  - name: smoke
    concurrency: 1
    requests: 1
"#,
    )?;

    let output = run_prxbench(vec![
        "run".to_string(),
        plan.display().to_string(),
    ])
    .await?;

    assert_eq!(output.status.code(), Some(EXIT_INVALID_INPUT));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("endpoint"),
        "expected an endpoint error, got:\n{stderr}"
    );
    Ok(())
}

#[tokio::test]
async fn unknown_scenario_selection_is_invalid_input() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let plan = write_plan(
        &dir,
        r#"
endpoints:
  - name: latency
    url: http://127.0.0.1:1/plaintext
scenarios:
  - name: smoke
    concurrency: 1
    requests: 1
"#,
    )?;

    let output = run_prxbench(vec![
        "run".to_string(),
        plan.display().to_string(),
        "--scenario".to_string(),
        "warmup".to_string(),
    ])
    .await?;

    assert_eq!(output.status.code(), Some(EXIT_INVALID_INPUT));
    Ok(())
}

#[tokio::test]
async fn failed_thresholds_flip_the_exit_code() -> anyhow::Result<()> {
    // Zero proxies: success rate is 0.00%, far below the gate.
    let dir = tempfile::tempdir()?;
    let plan = write_plan(
        &dir,
        r#"
endpoints:
  - name: latency
    url: http://127.0.0.1:1/plaintext
scenarios:
  - name: heavy_load
    concurrency: 5
    requests: 10
    timeout: 1s
thresholds:
  minSuccessRate: 0.95
"#,
    )?;

    let output = run_prxbench(vec![
        "run".to_string(),
        plan.display().to_string(),
    ])
    .await?;

    assert_eq!(output.status.code(), Some(EXIT_THRESHOLDS_FAILED));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("thresholds failed"),
        "expected threshold diagnostics, got:\n{stderr}"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Success Rate: 0.00%"),
        "expected a rendered report, got:\n{stdout}"
    );
    assert!(stdout.contains("  - No proxy available"));
    Ok(())
}

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let unit = unit_str.trim();
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report.
    HumanReadable,
    /// Emit the final summary as a JSON line (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "prxbench",
    author,
    version,
    about = "Proxy-routed load benchmarking harness",
    long_about = "prxbench drives synthetic HTTP load against configured endpoints through a rotating pool of forward proxies, under named load scenarios, and reduces the outcomes into per-endpoint and per-proxy statistics.\n\nA benchmark plan is a YAML file defining proxies, endpoints, scenarios, and optional thresholds. CLI flags override plan values.",
    after_help = "Examples:\n  prxbench run bench.yaml\n  prxbench run bench.yaml --scenario heavy_load --output json\n  prxbench run bench.yaml --concurrency 50 --requests 100 --timeout 20s\n  prxbench run bench.yaml --report-file report/benchmark_summary.txt"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a benchmark plan
    #[command(
        long_about = "Run every scenario of a benchmark plan and print the aggregated report.\n\nCLI flags override values from the plan file."
    )]
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the benchmark plan (.yaml)
    pub plan: PathBuf,

    /// Only run the named scenarios (repeatable)
    #[arg(long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// Override parallel workers per endpoint for every scenario
    #[arg(long)]
    pub concurrency: Option<u64>,

    /// Override requests per endpoint for every scenario
    #[arg(long)]
    pub requests: Option<u64>,

    /// Override the per-request deadline (e.g. 10s, 250ms)
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Also write the rendered report to a file
    #[arg(long, value_name = "PATH")]
    pub report_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(2 * 60 * 60)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn cli_parses_run_with_overrides() {
        let parsed = Cli::try_parse_from([
            "prxbench",
            "run",
            "bench.yaml",
            "--scenario",
            "light_load",
            "--scenario",
            "heavy_load",
            "--concurrency",
            "50",
            "--requests",
            "100",
            "--timeout",
            "20s",
            "--output",
            "json",
            "--report-file",
            "out/summary.txt",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.plan, PathBuf::from("bench.yaml"));
                assert_eq!(
                    args.scenarios,
                    vec!["light_load".to_string(), "heavy_load".to_string()]
                );
                assert_eq!(args.concurrency, Some(50));
                assert_eq!(args.requests, Some(100));
                assert_eq!(args.timeout, Some(Duration::from_secs(20)));
                assert!(matches!(args.output, OutputFormat::Json));
                assert_eq!(args.report_file, Some(PathBuf::from("out/summary.txt")));
            }
        }
    }

    #[test]
    fn cli_defaults_to_human_readable_output() {
        let parsed = Cli::try_parse_from(["prxbench", "run", "bench.yaml"]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert!(matches!(args.output, OutputFormat::HumanReadable));
                assert!(args.scenarios.is_empty());
            }
        }
    }
}

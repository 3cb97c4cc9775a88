use std::fmt::Write as _;

use prxbench_metrics::{EndpointSnapshot, RunSnapshot};

/// Renders the final benchmark report.
///
/// Pure function of the snapshot: identical snapshots render identical
/// bytes. Rates are percentages with two decimals, times are seconds with
/// three decimals.
#[must_use]
pub fn render(snapshot: &RunSnapshot) -> String {
    let mut out = String::new();
    for scenario in &snapshot.scenarios {
        for endpoint in &scenario.endpoints {
            render_endpoint(&mut out, &scenario.scenario, endpoint);
        }
    }
    out
}

fn render_endpoint(out: &mut String, scenario: &str, e: &EndpointSnapshot) {
    let _ = writeln!(out, "Scenario: {scenario}");
    let _ = writeln!(out, "Endpoint: {}", e.endpoint);
    let _ = writeln!(out, "Success Rate: {}%", pct(e.success_rate));
    let _ = writeln!(out, "Average Response Time: {}s", secs(e.avg_response_time));
    let _ = writeln!(out, "Error Rate: {}%", pct(e.error_rate));
    let _ = writeln!(out, "Timeout Rate: {}%", pct(e.timeout_rate));
    out.push('\n');

    // No proxy ever carried an attempt (every checkout failed): the
    // section is omitted rather than rendered empty.
    if !e.proxies.is_empty() {
        out.push_str("Proxy Performance:\n");
        for p in &e.proxies {
            let _ = writeln!(out, "  Proxy {}:", p.proxy);
            let _ = writeln!(out, "    Success Rate: {}%", pct(p.success_rate));
            let _ = writeln!(out, "    Average Response Time: {}s", secs(p.avg_response_time));
            let _ = writeln!(out, "    Total Requests: {}", p.attempts);
        }
        out.push('\n');
    }

    out.push_str("Response Time Percentiles:\n");
    let _ = writeln!(out, "  50th: {}s", secs(micros_to_secs(e.percentiles.p50)));
    let _ = writeln!(out, "  75th: {}s", secs(micros_to_secs(e.percentiles.p75)));
    let _ = writeln!(out, "  90th: {}s", secs(micros_to_secs(e.percentiles.p90)));
    let _ = writeln!(out, "  95th: {}s", secs(micros_to_secs(e.percentiles.p95)));
    let _ = writeln!(out, "  99th: {}s", secs(micros_to_secs(e.percentiles.p99)));
    out.push('\n');

    if !e.error_samples.is_empty() {
        out.push_str("Sample Errors:\n");
        for msg in &e.error_samples {
            let _ = writeln!(out, "  - {msg}");
        }
        out.push('\n');
    }
}

fn pct(rate: f64) -> String {
    format!("{:.2}", rate * 100.0)
}

fn secs(seconds: f64) -> String {
    format!("{seconds:.3}")
}

fn micros_to_secs(micros: u64) -> f64 {
    micros as f64 / 1e6
}

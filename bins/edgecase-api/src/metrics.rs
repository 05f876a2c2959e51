// Prometheus metrics for the HTTP service

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "edgecase_runs_total",
        "Test runs by outcome (report, rejected, setup_error, runner_failure)",
        &["outcome"]
    )
    .expect("metric can be registered");
    pub static ref CASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "edgecase_cases_total",
        "Executed test cases by status",
        &["status"]
    )
    .expect("metric can be registered");
    pub static ref RUN_DURATION_SECONDS: Histogram = register_histogram!(
        "edgecase_run_duration_seconds",
        "Wall-clock duration of one boundary process run",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("metric can be registered");
}

pub fn record_outcome(outcome: &str) {
    RUNS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_cases(passed: usize, failed: usize) {
    CASES_TOTAL.with_label_values(&["passed"]).inc_by(passed as u64);
    CASES_TOTAL.with_label_values(&["failed"]).inc_by(failed as u64);
}

/// Text exposition of every registered metric
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_metrics() {
        record_outcome("report");
        record_cases(2, 1);
        RUN_DURATION_SECONDS.observe(0.2);

        let text = render();

        assert!(text.contains("edgecase_runs_total"));
        assert!(text.contains("edgecase_cases_total"));
        assert!(text.contains("edgecase_run_duration_seconds"));
    }
}

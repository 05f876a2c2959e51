mod engine;
mod evaluator;
mod interpreter;
mod observer;
mod runner;
mod store;


use clap::Parser;
use edgecase_common::config::Config;
use edgecase_common::types::RunnerOutput;
use runner::TestRunner;
use std::path::PathBuf;
use tracing::{error, info};

/// Boundary process: runs one function against one set of test cases and
/// prints a single JSON document on stdout
#[derive(Parser)]
#[command(name = "edgecase-runner")]
#[command(about = "Run a user function against test cases in an isolated process", long_about = None)]
struct Args {
    /// File containing the function source
    code_file: PathBuf,

    /// File containing {"inputs": [...], "outputs": [...]}
    data_file: PathBuf,

    /// Name of the function to test
    function_name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // stdout carries the result document; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    // Exit status 1 is reserved for usage errors; setup failures are envelopes
    let config = match Config::load_default() {
        Ok(config) => config,
        Err(e) => {
            emit(&runner::config_failure(format!("{:#}", e)));
            return;
        }
    };

    info!(
        function = %args.function_name,
        case_timeout_ms = config.case_timeout_ms,
        fault_policy = %config.fault_policy,
        "Runner starting"
    );

    let output = TestRunner::new(config)
        .run(&args.code_file, &args.data_file, &args.function_name)
        .await;

    emit(&output);

    if let RunnerOutput::Report(report) = &output {
        info!(
            passed = report.summary.passed_count,
            failed = report.summary.failed_count,
            "Runner finished"
        );
    }
}

/// Print the single stdout document
fn emit(output: &RunnerOutput) {
    match serde_json::to_string(output) {
        Ok(line) => println!("{}", line),
        Err(e) => {
            error!(error = %e, "Failed to serialize runner output");
            std::process::exit(1);
        }
    }
}

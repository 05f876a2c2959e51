// CLI commands for Edgecase
use anyhow::{bail, Context, Result};
use edgecase_common::boundary::BoundaryClient;
use edgecase_common::cases::{extract_function_name, normalize_cases, parse_case_lists};
use edgecase_common::config::{Config, DEFAULT_CONFIG_PATH};
use edgecase_common::types::RunnerOutput;
use edgecase_common::{CaseStatus, RunReport};
use std::fs;
use std::path::Path;

/// Longest rendering of a value inside the results table
const MAX_CELL_CHARS: usize = 40;

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_CELL_CHARS - 3).collect();
    format!("{}...", head)
}

/// Render a report as a plain-text table
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<6} {:<8} {:>12}  {:<40}  {}\n",
        "CASE", "STATUS", "TIME (ms)", "INPUT", "DETAIL"
    ));

    for result in &report.results {
        let marker = match result.status {
            CaseStatus::Passed => "✓ pass",
            CaseStatus::Failed => "✗ fail",
        };
        let time = result
            .execution_time_ms
            .map(|ms| format!("{:.4}", ms))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<6} {:<8} {:>12}  {:<40}  {}\n",
            result.case_index,
            marker,
            time,
            truncate(&result.test_input.to_string()),
            result.error.as_deref().unwrap_or("")
        ));
    }

    out.push_str(&format!(
        "\nPassed: {}  Failed: {}  Total: {}\n",
        report.summary.passed_count,
        report.summary.failed_count,
        report.summary.total()
    ));
    out
}

/// Run a submission locally through the runner process
pub async fn run_check(
    code_path: &str,
    inputs: &str,
    outputs: &str,
    runner: Option<&str>,
    json: bool,
) -> Result<()> {
    let source = fs::read_to_string(code_path)
        .with_context(|| format!("Failed to read code file: {}", code_path))?;

    let (input_list, output_list) = parse_case_lists(inputs, outputs)?;
    let (input_list, output_list) = normalize_cases(input_list, output_list);
    let function_name = extract_function_name(&source)?;

    let mut config = Config::load_default()?;
    if let Some(runner) = runner {
        config.runner_path = runner.to_string();
    }

    if !json {
        println!("🚀 Testing '{}' against {} case(s)", function_name, input_list.len());
    }

    let run = BoundaryClient::new(&config)
        .run(&source, input_list, output_list, &function_name)
        .await
        .context("Runner produced no usable output")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.output)?);
    }

    match run.output {
        RunnerOutput::Report(report) => {
            if !json {
                println!();
                print!("{}", render_report(&report));
            }
            if report.summary.failed_count > 0 {
                bail!(
                    "{} of {} case(s) failed",
                    report.summary.failed_count,
                    report.summary.total()
                );
            }
            if !json {
                println!("✅ All cases passed");
            }
            Ok(())
        }
        RunnerOutput::Error(envelope) => {
            bail!("{} ({})", envelope.error, envelope.kind)
        }
    }
}

/// Initialize a project directory with a default configuration
pub async fn init_project(path: &str) -> Result<()> {
    println!("🚀 Initializing Edgecase project at: {}", path);

    let project_path = Path::new(path);
    let config_path = project_path.join(DEFAULT_CONFIG_PATH);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if config_path.exists() {
        println!("  ⚠ Skipped: {} already exists", DEFAULT_CONFIG_PATH);
    } else {
        let json_content = serde_json::to_string_pretty(&Config::default())?;
        fs::write(&config_path, json_content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("  ✅ Created: {}", DEFAULT_CONFIG_PATH);
    }

    println!("✅ Project initialized successfully!");
    println!("\n📋 Next steps:");
    println!("  1. Adjust case_timeout_ms and fault_policy in {}", DEFAULT_CONFIG_PATH);
    println!("  2. Check a function: edgecase-cli run --code solution.py --inputs '[[1,2,3]]' --outputs '[6]'");
    println!("  3. Start the service: edgecase-api");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgecase_common::{CaseResult, RunSummary, Value};

    fn sample_report() -> RunReport {
        RunReport {
            results: vec![
                CaseResult {
                    case_index: 1,
                    status: CaseStatus::Failed,
                    error: Some("Expected 6, but got 3".to_string()),
                    execution_time_ms: Some(0.0421),
                    test_input: Value::from(vec![1i64, 2, 3]),
                    test_output: Value::Int(6),
                    actual_output: Some(Value::Int(3)),
                },
                CaseResult {
                    case_index: 2,
                    status: CaseStatus::Failed,
                    error: Some("An ERROR occurred: division by zero".to_string()),
                    execution_time_ms: None,
                    test_input: Value::Sequence(vec![]),
                    test_output: Value::Int(0),
                    actual_output: None,
                },
            ],
            summary: RunSummary {
                passed_count: 0,
                failed_count: 2,
                test_inputs: vec![Value::from(vec![1i64, 2, 3]), Value::Sequence(vec![])],
                test_outputs: vec![Value::Int(6), Value::Int(0)],
            },
        }
    }

    #[test]
    fn test_render_report() {
        let table = render_report(&sample_report());

        assert!(table.contains("Expected 6, but got 3"));
        assert!(table.contains("0.0421"));
        assert!(table.contains("[1, 2, 3]"));
        assert!(table.contains("Passed: 0  Failed: 2  Total: 2"));
    }

    #[test]
    fn test_truncate_long_values() {
        let long = "x".repeat(100);
        let cell = truncate(&long);
        assert_eq!(cell.chars().count(), MAX_CELL_CHARS);
        assert!(cell.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn test_init_project_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        init_project(path).await.unwrap();

        let written = Config::load(&dir.path().join(DEFAULT_CONFIG_PATH)).unwrap();
        assert_eq!(written, Config::default());

        // Second run leaves the file alone
        fs::write(dir.path().join(DEFAULT_CONFIG_PATH), r#"{"case_timeout_ms": 10}"#).unwrap();
        init_project(path).await.unwrap();
        let kept = Config::load(&dir.path().join(DEFAULT_CONFIG_PATH)).unwrap();
        assert_eq!(kept.case_timeout_ms, 10);
    }

    #[tokio::test]
    async fn test_run_check_rejects_code_without_def() {
        let dir = tempfile::tempdir().unwrap();
        let code = dir.path().join("solution.py");
        fs::write(&code, "total = lambda nums: sum(nums)\n").unwrap();

        let err = run_check(code.to_str().unwrap(), "[[1]]", "[1]", None, false)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Function name not found"));
    }
}

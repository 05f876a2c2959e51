use crate::value::Value;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One registered `(input, expected_output)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Value,
    pub expected_output: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    Passed,
    Failed,
}

/// Per-case verdict, produced exactly once per test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// 1-based registration position
    pub case_index: usize,
    pub status: CaseStatus,
    pub error: Option<String>,
    /// Unset when the invocation faulted
    pub execution_time_ms: Option<f64>,
    pub test_input: Value,
    /// Expected output for this case
    pub test_output: Value,
    /// What the function returned, when it returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<Value>,
}

/// Folded counts plus the verbatim case table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(rename = "passed")]
    pub passed_count: usize,
    #[serde(rename = "failed")]
    pub failed_count: usize,
    pub test_inputs: Vec<Value>,
    pub test_outputs: Vec<Value>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.passed_count + self.failed_count
    }
}

/// Complete output of one engine invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<CaseResult>,
    #[serde(rename = "tests_summary")]
    pub summary: RunSummary,
}

/// Setup failure taxonomy reported by the boundary process.
/// Serialized as the `kind` field of the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupErrorKind {
    UnreadableInput,
    MalformedData,
    LengthMismatch,
    InterpreterUnavailable,
    LoadError,
    FunctionNotFound,
    Aborted,
    /// The runner's own configuration could not be loaded
    Config,
}

impl SetupErrorKind {
    /// Errors caused by what the user submitted, as opposed to the host
    pub fn is_user_fault(&self) -> bool {
        !matches!(
            self,
            SetupErrorKind::InterpreterUnavailable | SetupErrorKind::Config
        )
    }
}

impl fmt::Display for SetupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupErrorKind::UnreadableInput => "unreadable_input",
            SetupErrorKind::MalformedData => "malformed_data",
            SetupErrorKind::LengthMismatch => "length_mismatch",
            SetupErrorKind::InterpreterUnavailable => "interpreter_unavailable",
            SetupErrorKind::LoadError => "load_error",
            SetupErrorKind::FunctionNotFound => "function_not_found",
            SetupErrorKind::Aborted => "aborted",
            SetupErrorKind::Config => "config",
        };
        write!(f, "{}", name)
    }
}

/// Single error envelope written by the boundary process: `{"error": ..., "kind": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub kind: SetupErrorKind,
}

/// Test data file handed to the boundary process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestData {
    #[serde(default)]
    pub inputs: Vec<Value>,
    #[serde(default)]
    pub outputs: Vec<Value>,
}

/// Everything the boundary process may legitimately print on stdout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunnerOutput {
    Report(RunReport),
    Error(ErrorEnvelope),
}

// Dispatched on the `error` key: untagged buffering cannot carry
// arbitrary-precision numbers into typed fields.
impl<'de> Deserialize<'de> for RunnerOutput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let output = if raw.get("error").is_some() && raw.get("results").is_none() {
            serde_json::from_value(raw).map(RunnerOutput::Error)
        } else {
            serde_json::from_value(raw).map(RunnerOutput::Report)
        };
        output.map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        RunReport {
            results: vec![CaseResult {
                case_index: 1,
                status: CaseStatus::Failed,
                error: Some("Expected 6, but got 3".to_string()),
                execution_time_ms: Some(0.0123),
                test_input: Value::from(vec![1i64, 2, 3]),
                test_output: Value::Int(6),
                actual_output: Some(Value::Int(3)),
            }],
            summary: RunSummary {
                passed_count: 0,
                failed_count: 1,
                test_inputs: vec![Value::from(vec![1i64, 2, 3])],
                test_outputs: vec![Value::Int(6)],
            },
        }
    }

    #[test]
    fn test_report_wire_field_names() {
        let json = serde_json::to_value(sample_report()).unwrap();

        assert!(json.get("results").is_some());
        let summary = json.get("tests_summary").expect("tests_summary present");
        assert_eq!(summary["passed"], 0);
        assert_eq!(summary["failed"], 1);
        assert_eq!(json["results"][0]["case_index"], 1);
        assert_eq!(json["results"][0]["status"], "Failed");
        assert_eq!(json["results"][0]["test_output"], 6);
    }

    #[test]
    fn test_missing_actual_output_is_omitted() {
        let mut report = sample_report();
        report.results[0].actual_output = None;
        report.results[0].execution_time_ms = None;

        let json = serde_json::to_value(&report).unwrap();

        assert!(json["results"][0].get("actual_output").is_none());
        assert!(json["results"][0]["execution_time_ms"].is_null());
    }

    #[test]
    fn test_runner_output_distinguishes_envelope() {
        let envelope = r#"{"error":"Function 'solve' not found","kind":"function_not_found"}"#;
        match serde_json::from_str::<RunnerOutput>(envelope).unwrap() {
            RunnerOutput::Error(e) => assert_eq!(e.kind, SetupErrorKind::FunctionNotFound),
            other => panic!("expected envelope, got {:?}", other),
        }

        let report = serde_json::to_string(&sample_report()).unwrap();
        assert!(matches!(
            serde_json::from_str::<RunnerOutput>(&report).unwrap(),
            RunnerOutput::Report(_)
        ));
    }

    #[test]
    fn test_report_keeps_big_integers_exact() {
        let mut report = sample_report();
        report.results[0].test_output = Value::BigInt("18446744073709551617".to_string());
        report.results[0].actual_output = Some(Value::BigInt("18446744073709551616".to_string()));

        let wire = serde_json::to_string(&RunnerOutput::Report(report.clone())).unwrap();
        assert!(wire.contains("\"test_output\":18446744073709551617"));

        match serde_json::from_str::<RunnerOutput>(&wire).unwrap() {
            RunnerOutput::Report(parsed) => assert_eq!(parsed, report),
            other => panic!("expected report, got {:?}", other),
        }
    }

    #[test]
    fn test_config_kind_is_a_host_fault() {
        assert_eq!(serde_json::to_string(&SetupErrorKind::Config).unwrap(), "\"config\"");
        assert!(!SetupErrorKind::Config.is_user_fault());
        assert!(SetupErrorKind::MalformedData.is_user_fault());
    }

    #[test]
    fn test_data_defaults_to_empty() {
        let data: TestData = serde_json::from_str("{}").unwrap();
        assert!(data.inputs.is_empty());
        assert!(data.outputs.is_empty());
    }

    #[test]
    fn test_setup_error_kind_display_matches_wire() {
        let wire = serde_json::to_string(&SetupErrorKind::LengthMismatch).unwrap();
        assert_eq!(wire, format!("\"{}\"", SetupErrorKind::LengthMismatch));
    }
}

// HTTP route handlers for the Edgecase API

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use edgecase_common::boundary::BoundaryRun;
use edgecase_common::cases::{extract_function_name, normalize_cases, parse_case_lists};
use edgecase_common::types::RunnerOutput;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTestsRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub input_string: String,
    #[serde(default)]
    pub output_string: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// GET / - Service banner
pub async fn home() -> impl IntoResponse {
    info!("Home route accessed");
    (
        StatusCode::OK,
        Json(json!({
            "result": "Edgecase: quick edge case creation and validation for single-argument functions",
            "service": "edgecase",
        })),
    )
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn export_metrics() -> impl IntoResponse {
    (StatusCode::OK, metrics::render())
}

/// POST /runtests - Validate a submission and run it in a fresh runner process
pub async fn run_tests(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunTestsRequest>,
) -> Response {
    if payload.code.len() > state.config.max_source_bytes {
        metrics::record_outcome("rejected");
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "Source code exceeds maximum size of {} bytes",
                state.config.max_source_bytes
            ),
        );
    }

    let (inputs, outputs) = match parse_case_lists(&payload.input_string, &payload.output_string) {
        Ok(lists) => lists,
        Err(e) => {
            error!(error = %e, "Validation error");
            metrics::record_outcome("rejected");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };
    let (inputs, outputs) = normalize_cases(inputs, outputs);

    let function_name = match extract_function_name(&payload.code) {
        Ok(name) => name,
        Err(e) => {
            error!(error = %e, "Function name extraction error");
            metrics::record_outcome("rejected");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    info!(
        function = %function_name,
        cases = inputs.len(),
        source_size = payload.code.len(),
        "Submission accepted"
    );

    match state
        .boundary
        .run(&payload.code, inputs, outputs, &function_name)
        .await
    {
        Ok(run) => respond_with_run(run),
        Err(e) => {
            error!(error = %e, stderr = e.stderr().unwrap_or(""), "Runner produced no usable output");
            metrics::record_outcome("runner_failure");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

fn respond_with_run(run: BoundaryRun) -> Response {
    metrics::RUN_DURATION_SECONDS.observe(run.elapsed.as_secs_f64());

    match run.output {
        RunnerOutput::Report(report) => {
            info!(
                passed = report.summary.passed_count,
                failed = report.summary.failed_count,
                "Test summary"
            );
            metrics::record_outcome("report");
            metrics::record_cases(report.summary.passed_count, report.summary.failed_count);
            (
                StatusCode::OK,
                Json(json!({
                    "results": report.results,
                    "testSummary": report.summary,
                    "err": run.stderr,
                })),
            )
                .into_response()
        }
        RunnerOutput::Error(envelope) => {
            warn!(kind = %envelope.kind, error = %envelope.error, "Runner reported a setup error");
            metrics::record_outcome("setup_error");
            let status = if envelope.kind.is_user_fault() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(json!({ "error": envelope.error, "kind": envelope.kind })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use edgecase_common::boundary::BoundaryClient;
    use edgecase_common::config::Config;
    use edgecase_common::types::{ErrorEnvelope, SetupErrorKind};
    use edgecase_common::{RunReport, RunSummary};
    use std::time::Duration;

    fn test_state() -> Arc<AppState> {
        let config = Config {
            runner_path: "/nonexistent/edgecase-runner".to_string(),
            max_source_bytes: 64,
            ..Config::default()
        };
        Arc::new(AppState {
            boundary: BoundaryClient::new(&config),
            config,
        })
    }

    fn request(code: &str, input: &str, output: &str) -> RunTestsRequest {
        RunTestsRequest {
            code: code.to_string(),
            input_string: input.to_string(),
            output_string: output.to_string(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let response = run_tests(
            State(test_state()),
            Json(request("def f(x):\n  return x", "[1,", "[1]")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Error in parsing JSON input or output strings.");
    }

    #[tokio::test]
    async fn test_missing_def_is_rejected_before_running() {
        let response = run_tests(
            State(test_state()),
            Json(request("f = lambda x: x", "[[1]]", "[1]")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Function name not found in the provided code.");
    }

    #[tokio::test]
    async fn test_oversized_source() {
        let code = format!("def f(x):\n    return x\n{}", "#".repeat(100));
        let response = run_tests(State(test_state()), Json(request(&code, "[[1]]", "[1]"))).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_runner_failure_is_bad_gateway() {
        let response = run_tests(
            State(test_state()),
            Json(request("def f(x):\n  return x", "[[1]]", "[[1]]")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Subprocess execution failed"));
    }

    #[tokio::test]
    async fn test_report_is_relayed() {
        let run = BoundaryRun {
            output: RunnerOutput::Report(RunReport {
                results: vec![],
                summary: RunSummary::default(),
            }),
            stderr: "log line".to_string(),
            elapsed: Duration::from_millis(5),
        };

        let response = respond_with_run(run);

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["testSummary"]["passed"], 0);
        assert_eq!(body["err"], "log line");
        assert!(body["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_envelope_status_mapping() {
        let user_fault = BoundaryRun {
            output: RunnerOutput::Error(ErrorEnvelope {
                error: "Function 'f' not found in the provided code.".to_string(),
                kind: SetupErrorKind::FunctionNotFound,
            }),
            stderr: String::new(),
            elapsed: Duration::from_millis(5),
        };
        let response = respond_with_run(user_fault);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["kind"], "function_not_found");

        let host_fault = BoundaryRun {
            output: RunnerOutput::Error(ErrorEnvelope {
                error: "Failed to start interpreter 'python3'".to_string(),
                kind: SetupErrorKind::InterpreterUnavailable,
            }),
            stderr: String::new(),
            elapsed: Duration::from_millis(5),
        };
        assert_eq!(
            respond_with_run(host_fault).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

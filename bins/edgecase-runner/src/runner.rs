/// Test Runner - High-Level Orchestration inside the boundary process
///
/// **Responsibility:**
/// Turn `(code_file, data_file, function_name)` into exactly one
/// `RunnerOutput`: a complete report or a single error envelope.
///
/// **Architecture:**
/// 1. Read the source and the `{"inputs", "outputs"}` document
/// 2. Rebuild the test case store
/// 3. Resolve the function through the interpreter boundary
/// 4. Run the engine and return its report
///
/// Setup failures never reach the per-case results list.

use crate::engine::{EngineError, ExecutionEngine};
use crate::evaluator;
use crate::interpreter::{self, ResolveError};
use crate::observer::TracingObserver;
use crate::store::TestCaseStore;
use edgecase_common::config::Config;
use edgecase_common::types::{ErrorEnvelope, RunnerOutput, SetupErrorKind, TestData};
use edgecase_common::RunReport;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse test data: {0}")]
    MalformedData(#[from] serde_json::Error),
    #[error("Mismatch between inputs ({inputs}) and outputs ({outputs}) lengths.")]
    LengthMismatch { inputs: usize, outputs: usize },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SetupError {
    pub fn kind(&self) -> SetupErrorKind {
        match self {
            SetupError::Unreadable { .. } => SetupErrorKind::UnreadableInput,
            SetupError::MalformedData(_) => SetupErrorKind::MalformedData,
            SetupError::LengthMismatch { .. } => SetupErrorKind::LengthMismatch,
            SetupError::Resolve(ResolveError::Unavailable { .. }) => {
                SetupErrorKind::InterpreterUnavailable
            }
            SetupError::Resolve(ResolveError::Load(_)) => SetupErrorKind::LoadError,
            SetupError::Resolve(ResolveError::NotFound(_)) => SetupErrorKind::FunctionNotFound,
            SetupError::Engine(EngineError::Aborted { .. }) => SetupErrorKind::Aborted,
            SetupError::Config(_) => SetupErrorKind::Config,
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.to_string(),
            kind: self.kind(),
        }
    }
}

pub struct TestRunner {
    config: Config,
}

impl TestRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Produce the one document the boundary process prints
    pub async fn run(&self, code_file: &Path, data_file: &Path, function_name: &str) -> RunnerOutput {
        match self.try_run(code_file, data_file, function_name).await {
            Ok(report) => RunnerOutput::Report(report),
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Test execution failed");
                RunnerOutput::Error(e.to_envelope())
            }
        }
    }

    async fn try_run(
        &self,
        code_file: &Path,
        data_file: &Path,
        function_name: &str,
    ) -> Result<RunReport, SetupError> {
        let source = read_file(code_file).await?;
        let raw_data = read_file(data_file).await?;
        let data: TestData = serde_json::from_str(&raw_data)?;

        if data.inputs.len() != data.outputs.len() {
            return Err(SetupError::LengthMismatch {
                inputs: data.inputs.len(),
                outputs: data.outputs.len(),
            });
        }

        let store: TestCaseStore = data.inputs.into_iter().zip(data.outputs).collect();
        info!(cases = store.len(), function = function_name, "Test data loaded");

        let mut function = interpreter::resolve_function(&self.config, &source, function_name).await?;

        let observer = TracingObserver;
        let engine = ExecutionEngine::new(&self.config, &observer);
        let report = engine.run(&store, &mut function).await?;

        debug_assert_eq!(evaluator::summarize(&report.results), report.summary);
        Ok(report)
    }
}

/// Envelope printed when the runner cannot even load its configuration
pub fn config_failure(reason: impl Into<String>) -> RunnerOutput {
    let err = SetupError::Config(reason.into());
    error!(kind = %err.kind(), error = %err, "Runner configuration rejected");
    RunnerOutput::Error(err.to_envelope())
}

async fn read_file(path: &Path) -> Result<String, SetupError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SetupError::Unreadable {
            path: path.to_path_buf(),
            source,
        })
}

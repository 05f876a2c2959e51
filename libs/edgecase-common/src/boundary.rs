/// Boundary Client - parent side of the process isolation boundary
///
/// **Responsibility:**
/// Hand one submission to a fresh runner process and bring back exactly one
/// usable answer.
///
/// **Protocol:**
/// 1. Write the source and `{"inputs": [...], "outputs": [...]}` to a private
///    temp directory
/// 2. Spawn `<runner> <code_file> <data_file> <function_name>`
/// 3. Read exactly one JSON document from stdout
///
/// **Failure Rules:**
/// A crash, a non-zero exit, a run past the deadline, empty stdout or stdout
/// that is not a report/envelope is a `BoundaryError`. It is never turned into
/// an empty report.
///
/// **Deadline:**
/// The runner leads its own process group. When the run deadline fires the
/// whole group is killed, interpreter sessions included. The deadline grows
/// with the case count so a slow but legitimate run still reports.

use crate::config::Config;
use crate::types::{RunnerOutput, TestData};
use crate::value::Value;
use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("Subprocess execution failed: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Failed to stage submission files: {0}")]
    Staging(#[from] std::io::Error),
    #[error("Test run exceeded {0}ms and was killed")]
    TimedOut(u64),
    #[error("Runner exited with {status}")]
    Crashed { status: String, stderr: String },
    #[error("No output received from subprocess")]
    NoOutput { stderr: String },
    #[error("JSON decoding error: {reason}")]
    Malformed { reason: String, stderr: String },
}

impl BoundaryError {
    /// Runner stderr captured before the failure, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            BoundaryError::Crashed { stderr, .. }
            | BoundaryError::NoOutput { stderr }
            | BoundaryError::Malformed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Parsed answer plus the runner's diagnostic stream
#[derive(Debug, Clone)]
pub struct BoundaryRun {
    pub output: RunnerOutput,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Interpret the raw result of a finished runner process
pub fn parse_runner_output(
    success: bool,
    status: &str,
    stdout: &str,
    stderr: String,
) -> Result<RunnerOutput, BoundaryError> {
    if !success {
        return Err(BoundaryError::Crashed {
            status: status.to_string(),
            stderr,
        });
    }

    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(BoundaryError::NoOutput { stderr });
    }

    serde_json::from_str(trimmed).map_err(|e| BoundaryError::Malformed {
        reason: e.to_string(),
        stderr,
    })
}

/// Slack on top of the worst-case engine time
const RUN_DEADLINE_MARGIN: Duration = Duration::from_secs(1);

/// SIGKILL every process in the group led by `pid`
fn kill_process_group(pid: u32) {
    #[cfg(unix)]
    {
        let Ok(pid) = i32::try_from(pid) else {
            return;
        };
        unsafe {
            let _ = libc::kill(-pid, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
    }
}

#[derive(Debug, Clone)]
pub struct BoundaryClient {
    runner_path: PathBuf,
    run_timeout: Duration,
    case_timeout: Duration,
    env: Vec<(&'static str, String)>,
}

impl BoundaryClient {
    pub fn new(config: &Config) -> Self {
        Self {
            runner_path: PathBuf::from(&config.runner_path),
            run_timeout: Duration::from_millis(config.run_timeout_ms),
            case_timeout: Duration::from_millis(config.case_timeout_ms),
            env: config.runner_env(),
        }
    }

    /// Whole-run deadline for `cases` cases: never below `run_timeout`.
    /// The initial load plus one call and one session restart per case are
    /// each bounded by the case timeout.
    pub fn deadline_for(&self, cases: usize) -> Duration {
        let slots = u32::try_from(cases)
            .unwrap_or(u32::MAX)
            .saturating_mul(2)
            .saturating_add(1);
        let worst_case = self
            .case_timeout
            .saturating_mul(slots)
            .saturating_add(RUN_DEADLINE_MARGIN);
        self.run_timeout.max(worst_case)
    }

    /// Run one submission in a fresh runner process
    #[instrument(skip(self, source, inputs, outputs), fields(run_id = %uuid::Uuid::new_v4(), cases = inputs.len()))]
    pub async fn run(
        &self,
        source: &str,
        inputs: Vec<Value>,
        outputs: Vec<Value>,
        function_name: &str,
    ) -> Result<BoundaryRun, BoundaryError> {
        let deadline = self.deadline_for(inputs.len());

        // Removed on drop, whatever the outcome
        let workdir = tempfile::Builder::new().prefix("edgecase-").tempdir()?;
        let code_path = workdir.path().join("user_code.py");
        let data_path = workdir.path().join("test_data.json");

        let data = serde_json::to_vec(&TestData { inputs, outputs })
            .map_err(|e| BoundaryError::Staging(std::io::Error::other(e)))?;
        tokio::fs::write(&code_path, source).await?;
        tokio::fs::write(&data_path, data).await?;

        debug!(runner = %self.runner_path.display(), function = function_name, "Spawning runner");

        let mut std_command = StdCommand::new(&self.runner_path);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            std_command.process_group(0);
        }

        let start = Instant::now();
        let child = Command::from(std_command)
            .arg(&code_path)
            .arg(&data_path)
            .arg(function_name)
            .envs(self.env.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(BoundaryError::Spawn)?;
        let pid = child.id();

        let finished = tokio::time::timeout(deadline, child.wait_with_output()).await;
        let elapsed = start.elapsed();

        let output = match finished {
            Ok(result) => result.map_err(BoundaryError::Spawn)?,
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                let timeout_ms = deadline.as_millis() as u64;
                warn!(timeout_ms, "Runner exceeded run deadline, process group killed");
                return Err(BoundaryError::TimedOut(timeout_ms));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let parsed = parse_runner_output(
            output.status.success(),
            &output.status.to_string(),
            &stdout,
            stderr.clone(),
        )?;

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            outcome = match &parsed {
                RunnerOutput::Report(_) => "report",
                RunnerOutput::Error(_) => "envelope",
            },
            "Runner finished"
        );

        Ok(BoundaryRun {
            output: parsed,
            stderr,
            elapsed,
        })
    }
}

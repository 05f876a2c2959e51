/// Interpreter Boundary - function resolution for untrusted source
///
/// **Responsibility:**
/// `resolve_function(source, name) -> PythonFunction | ResolveError`.
/// User code never runs inside this process. It is loaded by a Python
/// session process which answers one JSON line per call.
///
/// **Session Protocol (line-delimited JSON):**
/// 1. Source and function name arrive via `EDGECASE_SOURCE` (base64) and
///    `EDGECASE_FUNCTION`
/// 2. Handshake: `{"status": "ready"}`, `{"status": "load_error", ...}` or
///    `{"status": "not_found", ...}`
/// 3. Per call: request is the input value; reply is `{"ok": value}` or
///    `{"error": message}`
///
/// 3a. A return value with no plain JSON form (tuple, set, non-string keys,
///     non-finite float) is answered as `{"repr": text}`
///
/// **Recovery:**
/// A session is taken out of `PythonFunction` for the duration of a call and
/// only put back after a clean reply. If the call is cancelled (deadline) or
/// the process dies, the session is dropped and its child is killed.
/// `prepare` starts a fresh session with the module reloaded before the next
/// case's timer starts.

use crate::engine::{InvocationError, TargetFunction};
use base64::{engine::general_purpose, Engine as _};
use edgecase_common::config::Config;
use edgecase_common::Value;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

const HARNESS: &str = include_str!("../harness/harness.py");

/// Safety limit mirrored from the HTTP service
const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to start interpreter '{interpreter}': {source}")]
    Unavailable {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Load(String),
    #[error("{0}")]
    NotFound(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Handshake {
    Ready,
    LoadError { message: String },
    NotFound { message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Reply {
    Ok(Value),
    Repr(String),
    Error(String),
}

/// Everything needed to (re)start a session
#[derive(Debug, Clone)]
struct SessionSpec {
    interpreter: String,
    encoded_source: String,
    function_name: String,
    load_timeout: Duration,
}

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl SessionSpec {
    async fn start(&self) -> Result<Session, ResolveError> {
        let mut child = Command::new(&self.interpreter)
            .arg("-u")
            .arg("-c")
            .arg(HARNESS)
            .env("EDGECASE_SOURCE", &self.encoded_source)
            .env("EDGECASE_FUNCTION", &self.function_name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ResolveError::Unavailable {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ResolveError::Unavailable {
            interpreter: self.interpreter.clone(),
            source: std::io::Error::other("stdin not captured"),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ResolveError::Unavailable {
            interpreter: self.interpreter.clone(),
            source: std::io::Error::other("stdout not captured"),
        })?;
        let mut stdout = BufReader::new(stdout).lines();

        let first_line = tokio::time::timeout(self.load_timeout, stdout.next_line())
            .await
            .map_err(|_| {
                ResolveError::Load(format!(
                    "Loading the code took longer than {} ms",
                    self.load_timeout.as_millis()
                ))
            })?
            .map_err(|e| ResolveError::Load(format!("Failed to read interpreter handshake: {}", e)))?;

        let line = match first_line {
            Some(line) => line,
            None => {
                let status = child.wait().await.map(|s| s.to_string()).unwrap_or_default();
                return Err(ResolveError::Load(format!(
                    "Interpreter exited before loading the code ({})",
                    status
                )));
            }
        };

        let handshake: Handshake = serde_json::from_str(&line)
            .map_err(|e| ResolveError::Load(format!("Invalid interpreter handshake: {}", e)))?;

        match handshake {
            Handshake::Ready => Ok(Session {
                child,
                stdin,
                stdout,
            }),
            Handshake::LoadError { message } => Err(ResolveError::Load(message)),
            Handshake::NotFound { message } => Err(ResolveError::NotFound(message)),
        }
    }
}

/// A function living in a Python session process
pub struct PythonFunction {
    spec: SessionSpec,
    session: Option<Session>,
    restarts: u32,
}

/// Load `source` in a fresh interpreter and look up `function_name`.
/// The engine is never invoked unless this succeeds.
pub async fn resolve_function(
    config: &Config,
    source: &str,
    function_name: &str,
) -> Result<PythonFunction, ResolveError> {
    if source.len() > MAX_SOURCE_CODE_BYTES {
        return Err(ResolveError::Load(format!(
            "Source code exceeds maximum size of {} bytes",
            MAX_SOURCE_CODE_BYTES
        )));
    }
    if function_name.trim().is_empty() {
        return Err(ResolveError::NotFound(
            "Function name not found in the provided code.".to_string(),
        ));
    }

    let spec = SessionSpec {
        interpreter: config.interpreter.clone(),
        encoded_source: general_purpose::STANDARD.encode(source),
        function_name: function_name.to_string(),
        load_timeout: Duration::from_millis(config.case_timeout_ms),
    };

    let session = spec.start().await?;
    info!(interpreter = %spec.interpreter, function = function_name, "Function resolved");

    Ok(PythonFunction {
        spec,
        session: Some(session),
        restarts: 0,
    })
}

impl PythonFunction {
    async fn exchange(session: &mut Session, request: &str) -> Result<Value, InvocationError> {
        session
            .stdin
            .write_all(request.as_bytes())
            .await
            .map_err(|e| InvocationError::Crashed(e.to_string()))?;
        session
            .stdin
            .flush()
            .await
            .map_err(|e| InvocationError::Crashed(e.to_string()))?;

        let line = match session.stdout.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                let status = match session.child.try_wait() {
                    Ok(Some(status)) => status.to_string(),
                    _ => "stdout closed".to_string(),
                };
                return Err(InvocationError::Crashed(status));
            }
            Err(e) => return Err(InvocationError::Crashed(e.to_string())),
        };

        match serde_json::from_str::<Reply>(&line) {
            Ok(Reply::Ok(value)) => Ok(value),
            Ok(Reply::Repr(repr)) => Ok(Value::Opaque(repr)),
            Ok(Reply::Error(message)) => Err(InvocationError::Raised(message)),
            Err(e) => Err(InvocationError::Protocol(e.to_string())),
        }
    }
}

impl TargetFunction for PythonFunction {
    async fn prepare(&mut self) -> Result<(), InvocationError> {
        if self.session.is_some() {
            return Ok(());
        }
        self.restarts += 1;
        warn!(restarts = self.restarts, "Restarting interpreter session");
        let session = self
            .spec
            .start()
            .await
            .map_err(|e| InvocationError::Crashed(format!("session restart failed: {}", e)))?;
        self.session = Some(session);
        Ok(())
    }

    async fn call(&mut self, input: &Value) -> Result<Value, InvocationError> {
        self.prepare().await?;
        let mut session = self
            .session
            .take()
            .ok_or_else(|| InvocationError::Crashed("no interpreter session".to_string()))?;

        let mut request = serde_json::to_string(input)
            .map_err(|e| InvocationError::Protocol(e.to_string()))?;
        request.push('\n');

        let outcome = Self::exchange(&mut session, &request).await;

        // Clean replies keep the session; anything else discards it
        match &outcome {
            Ok(_) | Err(InvocationError::Raised(_)) => self.session = Some(session),
            Err(e) => debug!(error = %e, "Discarding interpreter session"),
        }
        outcome
    }
}

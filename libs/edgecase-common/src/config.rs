// Service configuration: JSON file with environment overrides
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = "config/edgecase.json";

pub const ENV_CASE_TIMEOUT_MS: &str = "EDGECASE_CASE_TIMEOUT_MS";
pub const ENV_FAULT_POLICY: &str = "EDGECASE_FAULT_POLICY";
pub const ENV_PYTHON: &str = "EDGECASE_PYTHON";
pub const ENV_RUNNER: &str = "EDGECASE_RUNNER";
pub const ENV_RUN_TIMEOUT_MS: &str = "EDGECASE_RUN_TIMEOUT_MS";
pub const ENV_BIND: &str = "EDGECASE_BIND";

/// What the engine does when the target function raises for a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Record a Failed result and run the remaining cases
    #[default]
    Continue,
    /// Stop at the first fault and report a top-level error
    Abort,
}

impl FromStr for FaultPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FaultPolicy::Continue),
            "abort" => Ok(FaultPolicy::Abort),
            other => bail!("Unknown fault policy '{}' (expected 'continue' or 'abort')", other),
        }
    }
}

impl fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultPolicy::Continue => write!(f, "continue"),
            FaultPolicy::Abort => write!(f, "abort"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wall-clock deadline for a single invocation
    pub case_timeout_ms: u64,
    pub fault_policy: FaultPolicy,
    /// Python executable hosting user code
    pub interpreter: String,
    /// Boundary process binary spawned once per run
    pub runner_path: String,
    /// Deadline for a whole boundary process run
    pub run_timeout_ms: u64,
    pub bind_addr: String,
    pub max_source_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            case_timeout_ms: 5000,
            fault_policy: FaultPolicy::Continue,
            interpreter: "python3".to_string(),
            runner_path: "edgecase-runner".to_string(),
            run_timeout_ms: 60_000,
            bind_addr: "0.0.0.0:5000".to_string(),
            max_source_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file; missing fields take defaults
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Load `config/edgecase.json` when present, defaults otherwise,
    /// then apply environment overrides
    pub fn load_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        let base = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CASE_TIMEOUT_MS) {
            self.case_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_CASE_TIMEOUT_MS, raw))?;
        }
        if let Some(raw) = lookup(ENV_FAULT_POLICY) {
            self.fault_policy = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_PYTHON) {
            self.interpreter = raw;
        }
        if let Some(raw) = lookup(ENV_RUNNER) {
            self.runner_path = raw;
        }
        if let Some(raw) = lookup(ENV_RUN_TIMEOUT_MS) {
            self.run_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_RUN_TIMEOUT_MS, raw))?;
        }
        if let Some(raw) = lookup(ENV_BIND) {
            self.bind_addr = raw;
        }

        if self.case_timeout_ms == 0 {
            bail!("case_timeout_ms must be greater than zero");
        }
        Ok(self)
    }

    /// Environment handed to the boundary process so it runs with the
    /// caller's engine settings
    pub fn runner_env(&self) -> Vec<(&'static str, String)> {
        vec![
            (ENV_CASE_TIMEOUT_MS, self.case_timeout_ms.to_string()),
            (ENV_FAULT_POLICY, self.fault_policy.to_string()),
            (ENV_PYTHON, self.interpreter.clone()),
        ]
    }
}

/// Execution Engine - runs one function against every stored case
///
/// **Core Responsibility:**
/// Invoke the target once per test case, strictly in registration order,
/// under a per-case failure boundary and a per-case wall-clock deadline.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to call the target (`TargetFunction`), not what it is
/// - Engine does NOT resolve functions or load code
/// - Engine does NOT serialize anything
/// - Aggregation is delegated to `ResultAggregator`
///
/// **Per-Case Rules:**
/// 0. `prepare` runs first, outside the timer and the deadline
/// 1. Timer starts immediately before the call, stops when it returns
/// 2. Return value deep-equal to expected → Passed
/// 3. Return value differs → Failed, "Expected {expected}, but got {actual}"
/// 4. Call raised, crashed or timed out → Failed, "An ERROR occurred: {message}",
///    no execution time
///
/// **Fault Policy:**
/// `Continue` records a faulted case and moves on. `Abort` stops at the first
/// fault and returns `EngineError::Aborted`; no partial report escapes.

use crate::evaluator::ResultAggregator;
use crate::observer::RunObserver;
use crate::store::TestCaseStore;
use edgecase_common::config::{Config, FaultPolicy};
use edgecase_common::{CaseResult, CaseStatus, RunReport, TestCase, Value};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// Why a single invocation produced no value
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvocationError {
    /// The function itself raised
    #[error("{0}")]
    Raised(String),
    #[error("execution timed out after {0} ms")]
    TimedOut(u64),
    #[error("interpreter exited unexpectedly: {0}")]
    Crashed(String),
    #[error("invalid interpreter response: {0}")]
    Protocol(String),
}

/// A resolved, callable target taking exactly one positional value
pub trait TargetFunction {
    /// Get ready for the next call, e.g. replace a session lost to a fault.
    /// Not timed and not bounded by the case deadline.
    fn prepare(&mut self) -> impl Future<Output = Result<(), InvocationError>> {
        async { Ok(()) }
    }

    fn call(&mut self, input: &Value) -> impl Future<Output = Result<Value, InvocationError>>;
}

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("Run aborted at case {case_index}: {message}")]
    Aborted { case_index: usize, message: String },
}

/// Milliseconds rounded to 4 decimal places
pub fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 10_000.0).round() / 10_000.0
}

pub fn mismatch_message(expected: &Value, actual: &Value) -> String {
    format!("Expected {}, but got {}", expected, actual)
}

pub fn fault_message(error: &InvocationError) -> String {
    format!("An ERROR occurred: {}", error)
}

pub struct ExecutionEngine<'a> {
    case_timeout: Duration,
    fault_policy: FaultPolicy,
    observer: &'a dyn RunObserver,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(config: &Config, observer: &'a dyn RunObserver) -> Self {
        Self {
            case_timeout: Duration::from_millis(config.case_timeout_ms),
            fault_policy: config.fault_policy,
            observer,
        }
    }

    /// Run every stored case against `function` and build the report
    #[instrument(skip_all, fields(cases = store.len(), policy = %self.fault_policy))]
    pub async fn run<F: TargetFunction>(
        &self,
        store: &TestCaseStore,
        function: &mut F,
    ) -> Result<RunReport, EngineError> {
        let mut aggregator = ResultAggregator::with_capacity(store.len(), self.observer);

        for (idx, test_case) in store.iter().enumerate() {
            let case_index = idx + 1;
            self.observer.case_started(case_index, &test_case.input);

            let (result, faulted) = self.run_case(case_index, test_case, function).await;

            if faulted && self.fault_policy == FaultPolicy::Abort {
                let message = result.error.clone().unwrap_or_default();
                self.observer.case_finished(&result);
                tracing::warn!(
                    case_index,
                    completed = aggregator.recorded(),
                    "Aborting run on first fault"
                );
                return Err(EngineError::Aborted { case_index, message });
            }

            aggregator.record(result);
        }

        Ok(aggregator.finish())
    }

    /// Execute a single case under the failure boundary and deadline.
    /// The flag is true when the invocation faulted rather than returned.
    async fn run_case<F: TargetFunction>(
        &self,
        case_index: usize,
        test_case: &TestCase,
        function: &mut F,
    ) -> (CaseResult, bool) {
        if let Err(e) = function.prepare().await {
            return (faulted_result(case_index, test_case, &e), true);
        }

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.case_timeout, function.call(&test_case.input)).await;
        let elapsed = start.elapsed();

        let outcome = outcome.unwrap_or_else(|_| {
            Err(InvocationError::TimedOut(self.case_timeout.as_millis() as u64))
        });

        match outcome {
            Ok(actual) => {
                let (status, error) = if actual == test_case.expected_output {
                    (CaseStatus::Passed, None)
                } else {
                    (
                        CaseStatus::Failed,
                        Some(mismatch_message(&test_case.expected_output, &actual)),
                    )
                };
                let result = CaseResult {
                    case_index,
                    status,
                    error,
                    execution_time_ms: Some(round_ms(elapsed)),
                    test_input: test_case.input.clone(),
                    test_output: test_case.expected_output.clone(),
                    actual_output: Some(actual),
                };
                (result, false)
            }
            Err(e) => (faulted_result(case_index, test_case, &e), true),
        }
    }
}

fn faulted_result(case_index: usize, test_case: &TestCase, error: &InvocationError) -> CaseResult {
    CaseResult {
        case_index,
        status: CaseStatus::Failed,
        error: Some(fault_message(error)),
        execution_time_ms: None,
        test_input: test_case.input.clone(),
        test_output: test_case.expected_output.clone(),
        actual_output: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_ms_four_decimals() {
        assert_eq!(round_ms(Duration::from_nanos(1_234_567)), 1.2346);
        assert_eq!(round_ms(Duration::from_millis(5)), 5.0);
        assert_eq!(round_ms(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            mismatch_message(&Value::Int(6), &Value::Int(3)),
            "Expected 6, but got 3"
        );
        assert_eq!(
            fault_message(&InvocationError::Raised("division by zero".to_string())),
            "An ERROR occurred: division by zero"
        );
        assert_eq!(
            fault_message(&InvocationError::TimedOut(50)),
            "An ERROR occurred: execution timed out after 50 ms"
        );
    }
}

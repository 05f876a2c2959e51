// Run observers: injected into the engine and the aggregator instead of a
// process-wide logging setup inside the core

use edgecase_common::{CaseResult, CaseStatus, RunSummary, Value};
use tracing::{debug, info, warn};

pub trait RunObserver {
    fn case_started(&self, _case_index: usize, _input: &Value) {}
    fn case_finished(&self, _result: &CaseResult) {}
    fn run_finished(&self, _summary: &RunSummary) {}
}

/// Forwards run events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn case_started(&self, case_index: usize, input: &Value) {
        debug!(case_index, input_kind = input.kind(), "Executing test case");
    }

    fn case_finished(&self, result: &CaseResult) {
        match result.status {
            CaseStatus::Passed => debug!(
                case_index = result.case_index,
                execution_ms = result.execution_time_ms,
                "Test case passed"
            ),
            CaseStatus::Failed => warn!(
                case_index = result.case_index,
                execution_ms = result.execution_time_ms,
                error = result.error.as_deref().unwrap_or(""),
                "Test case failed"
            ),
        }
    }

    fn run_finished(&self, summary: &RunSummary) {
        info!(
            passed = summary.passed_count,
            failed = summary.failed_count,
            total = summary.total(),
            "Test summary"
        );
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records every event, for assertions on what the core reported
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        pub started: RefCell<Vec<usize>>,
        pub finished: RefCell<Vec<CaseResult>>,
        pub summaries: RefCell<Vec<RunSummary>>,
    }

    impl RunObserver for RecordingObserver {
        fn case_started(&self, case_index: usize, _input: &Value) {
            self.started.borrow_mut().push(case_index);
        }

        fn case_finished(&self, result: &CaseResult) {
            self.finished.borrow_mut().push(result.clone());
        }

        fn run_finished(&self, summary: &RunSummary) {
            self.summaries.borrow_mut().push(summary.clone());
        }
    }
}

/// Result Aggregator - folds per-case verdicts into a run report
///
/// **Core Responsibility:**
/// Count passes and failures and keep the verbatim case table, one case at a
/// time, in the order cases were executed.
///
/// **Critical Properties:**
/// - Knows nothing about how the function was invoked
/// - Knows nothing about interpreters or processes
/// - `passed + failed` always equals the number of recorded cases
/// - `results[i].test_input == test_inputs[i]` for every recorded case
///
/// The retained `test_inputs`/`test_outputs` let a caller re-render the whole
/// case table (quick re-test) without going back to the test case store.

use crate::observer::RunObserver;
use edgecase_common::{CaseResult, CaseStatus, RunReport, RunSummary};

/// Fold one verdict into a summary
pub fn fold_case(summary: &mut RunSummary, result: &CaseResult) {
    match result.status {
        CaseStatus::Passed => summary.passed_count += 1,
        CaseStatus::Failed => summary.failed_count += 1,
    }
    summary.test_inputs.push(result.test_input.clone());
    summary.test_outputs.push(result.test_output.clone());
}

/// Pure summary of a finished result sequence
pub fn summarize(results: &[CaseResult]) -> RunSummary {
    results.iter().fold(RunSummary::default(), |mut summary, result| {
        fold_case(&mut summary, result);
        summary
    })
}

/// Incremental aggregator owned by one engine run
pub struct ResultAggregator<'a> {
    results: Vec<CaseResult>,
    summary: RunSummary,
    observer: &'a dyn RunObserver,
}

impl<'a> ResultAggregator<'a> {
    pub fn with_capacity(capacity: usize, observer: &'a dyn RunObserver) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            summary: RunSummary {
                test_inputs: Vec::with_capacity(capacity),
                test_outputs: Vec::with_capacity(capacity),
                ..RunSummary::default()
            },
            observer,
        }
    }

    /// Append one verdict and fold it into the running summary
    pub fn record(&mut self, result: CaseResult) {
        fold_case(&mut self.summary, &result);
        self.observer.case_finished(&result);
        self.results.push(result);
    }

    pub fn recorded(&self) -> usize {
        self.results.len()
    }

    /// Close the run and hand the report to the caller
    pub fn finish(self) -> RunReport {
        self.observer.run_finished(&self.summary);
        RunReport {
            results: self.results,
            summary: self.summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::RecordingObserver;
    use edgecase_common::Value;

    fn make_result(case_index: usize, status: CaseStatus, input: i64, output: i64) -> CaseResult {
        CaseResult {
            case_index,
            status,
            error: match status {
                CaseStatus::Passed => None,
                CaseStatus::Failed => Some("Expected 1, but got 2".to_string()),
            },
            execution_time_ms: Some(0.01),
            test_input: Value::Int(input),
            test_output: Value::Int(output),
            actual_output: None,
        }
    }

    #[test]
    fn test_counts_by_status() {
        let results = vec![
            make_result(1, CaseStatus::Passed, 1, 1),
            make_result(2, CaseStatus::Failed, 2, 4),
            make_result(3, CaseStatus::Passed, 3, 9),
        ];

        let summary = summarize(&results);

        assert_eq!(summary.passed_count, 2);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.total(), results.len());
    }

    #[test]
    fn test_case_table_is_verbatim_and_ordered() {
        let results = vec![
            make_result(1, CaseStatus::Failed, 7, 49),
            make_result(2, CaseStatus::Passed, 5, 25),
        ];

        let summary = summarize(&results);

        assert_eq!(summary.test_inputs, vec![Value::Int(7), Value::Int(5)]);
        assert_eq!(summary.test_outputs, vec![Value::Int(49), Value::Int(25)]);
        for (idx, result) in results.iter().enumerate() {
            assert_eq!(result.test_input, summary.test_inputs[idx]);
        }
    }

    #[test]
    fn test_empty_run() {
        let summary = summarize(&[]);
        assert_eq!(summary, RunSummary::default());
    }

    #[test]
    fn test_aggregator_matches_pure_fold() {
        let observer = RecordingObserver::default();
        let mut aggregator = ResultAggregator::with_capacity(2, &observer);
        let results = vec![
            make_result(1, CaseStatus::Passed, 1, 1),
            make_result(2, CaseStatus::Failed, 2, 3),
        ];

        for result in results.clone() {
            aggregator.record(result);
        }
        assert_eq!(aggregator.recorded(), 2);
        let report = aggregator.finish();

        assert_eq!(report.summary, summarize(&results));
        assert_eq!(report.results, results);
        assert_eq!(observer.finished.borrow().len(), 2);
        assert_eq!(observer.summaries.borrow().len(), 1);
    }
}

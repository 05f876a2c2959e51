/// Submission Shaping - turns raw user strings into runnable case lists
///
/// **Responsibility:**
/// Everything that happens to a submission before it reaches the boundary
/// process:
/// 1. Validation: input/output strings must parse as JSON arrays
/// 2. Shape normalization: decide whether an array is one case or many
/// 3. Function-name extraction from the submitted source
///
/// Shared by the HTTP service and the CLI so both accept exactly the same
/// submissions.

use crate::value::Value;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref FUNCTION_DEF: Regex = Regex::new(r"def\s+(\w+)\s*\(").expect("valid regex");
}

#[derive(Debug, Error, PartialEq)]
pub enum CaseShapeError {
    #[error("Error in parsing JSON input or output strings.")]
    InvalidJson,
    #[error("Both input and output should be lists of cases.")]
    NotLists,
    #[error("Function name not found in the provided code.")]
    FunctionNameNotFound,
}

/// Parse the raw input and output strings; both must be JSON arrays
pub fn parse_case_lists(
    input_str: &str,
    output_str: &str,
) -> Result<(Vec<Value>, Vec<Value>), CaseShapeError> {
    let input: Value = serde_json::from_str(input_str).map_err(|_| CaseShapeError::InvalidJson)?;
    let output: Value = serde_json::from_str(output_str).map_err(|_| CaseShapeError::InvalidJson)?;

    match (input, output) {
        (Value::Sequence(inputs), Value::Sequence(outputs)) => Ok((inputs, outputs)),
        _ => Err(CaseShapeError::NotLists),
    }
}

/// True when every element is itself a sequence (vacuously true when empty)
fn is_nested(items: &[Value]) -> bool {
    items.iter().all(Value::is_sequence)
}

/// Normalize parsed lists into parallel `(inputs, expected_outputs)` vectors
///
/// **Shape Rules:**
/// - Nested input `[[..], [..]]`: each element is one case; each output
///   element is that case's expected value
/// - Flat input `[1, 2, 3]`: the whole array is a single case; the expected
///   value is `outputs[0]` when exactly one output is given, otherwise the
///   whole output array
///
/// Lengths are not checked here; the boundary process reports a mismatch.
pub fn normalize_cases(inputs: Vec<Value>, outputs: Vec<Value>) -> (Vec<Value>, Vec<Value>) {
    if is_nested(&inputs) {
        return (inputs, outputs);
    }

    let expected = if outputs.len() == 1 {
        outputs.into_iter().next().unwrap_or(Value::Null)
    } else {
        Value::Sequence(outputs)
    };

    (vec![Value::Sequence(inputs)], vec![expected])
}

/// Name of the first `def name(` in the source
pub fn extract_function_name(source: &str) -> Result<String, CaseShapeError> {
    FUNCTION_DEF
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(CaseShapeError::FunctionNameNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_rejects_non_arrays() {
        assert_eq!(parse_case_lists("5", "[5]"), Err(CaseShapeError::NotLists));
        assert_eq!(parse_case_lists("[1", "[5]"), Err(CaseShapeError::InvalidJson));
    }

    #[test]
    fn test_nested_inputs_are_many_cases() {
        let (inputs, outputs) = parse_case_lists("[[1,2,3],[]]", "[6,0]").unwrap();
        let (inputs, outputs) = normalize_cases(inputs, outputs);

        assert_eq!(inputs, vec![v("[1,2,3]"), v("[]")]);
        assert_eq!(outputs, vec![v("6"), v("0")]);
    }

    #[test]
    fn test_nested_outputs_stay_per_case() {
        let (inputs, outputs) = normalize_cases(
            vec![v("[3,1,2]"), v("[2,1]")],
            vec![v("[1,2,3]"), v("[1,2]")],
        );
        assert_eq!(inputs.len(), 2);
        assert_eq!(outputs, vec![v("[1,2,3]"), v("[1,2]")]);
    }

    #[test]
    fn test_flat_input_with_single_output() {
        let (inputs, outputs) = normalize_cases(vec![v("1"), v("2"), v("3")], vec![v("6")]);
        assert_eq!(inputs, vec![v("[1,2,3]")]);
        assert_eq!(outputs, vec![v("6")]);
    }

    #[test]
    fn test_flat_input_with_array_output() {
        let (inputs, outputs) = normalize_cases(vec![v("3"), v("1")], vec![v("1"), v("3")]);
        assert_eq!(inputs, vec![v("[3,1]")]);
        assert_eq!(outputs, vec![v("[1,3]")]);
    }

    #[test]
    fn test_empty_input_is_nested() {
        let (inputs, outputs) = normalize_cases(vec![], vec![v("0")]);
        assert!(inputs.is_empty());
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn test_extract_function_name() {
        let source = "import math\n\ndef  total (nums):\n    return sum(nums)\n";
        assert_eq!(extract_function_name(source).unwrap(), "total");
    }

    #[test]
    fn test_extract_function_name_takes_first_def() {
        let source = "def helper(x):\n    return x\n\ndef solve(nums):\n    return helper(nums)\n";
        assert_eq!(extract_function_name(source).unwrap(), "helper");
    }

    #[test]
    fn test_extract_function_name_missing() {
        assert_eq!(
            extract_function_name("total = lambda nums: sum(nums)"),
            Err(CaseShapeError::FunctionNameNotFound)
        );
    }
}

// Test case store: ordered, append-only, one per run

use edgecase_common::{TestCase, Value};

#[derive(Debug, Default)]
pub struct TestCaseStore {
    cases: Vec<TestCase>,
}

impl TestCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one case; registration order is execution order
    pub fn create_testcase(&mut self, input: Value, expected_output: Value) {
        self.cases.push(TestCase {
            input,
            expected_output,
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.cases.iter()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl FromIterator<(Value, Value)> for TestCaseStore {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut store = TestCaseStore::new();
        for (input, expected_output) in iter {
            store.create_testcase(input, expected_output);
        }
        store
    }
}

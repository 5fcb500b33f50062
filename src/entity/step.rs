use serde::{Deserialize, Serialize};

/// A single ordered step inside a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    /// 1-based position; kept contiguous by `renumber_steps`.
    pub step_number: u32,
    pub action: String,
    pub expected_result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_data: Option<String>,
}

impl TestStep {
    pub fn new(action: impl Into<String>, expected_result: impl Into<String>) -> Self {
        Self {
            step_number: 0,
            action: action.into(),
            expected_result: expected_result.into(),
            test_data: None,
        }
    }

    pub fn with_test_data(mut self, test_data: impl Into<String>) -> Self {
        self.test_data = Some(test_data.into());
        self
    }
}

/// Rewrite step numbers so they form a contiguous 1..N sequence matching
/// position. Called after any insertion or removal and before every save.
pub fn renumber_steps(steps: &mut [TestStep]) {
    for (i, step) in steps.iter_mut().enumerate() {
        step.step_number = (i + 1) as u32;
    }
}

//! The structured report the gate emits.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportError {
    pub path: String,
    pub message: String,
    pub expected: Option<String>,
    pub received: Option<String>,
}

impl ReportError {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            expected: None,
            received: None,
        }
    }

    #[must_use]
    pub fn with_expected_received(mut self, expected: impl Into<String>, received: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.received = Some(received.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportWarning {
    pub path: String,
    pub message: String,
}

impl ReportWarning {
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_sections: usize,
    pub reachable: usize,
    pub unreachable: usize,
    pub entry_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ReportError>,
    pub warnings: Vec<ReportWarning>,
    pub summary: Summary,
}

impl ValidationReport {
    #[must_use]
    pub fn exit_code(&self) -> cf_utils::ExitCode {
        if self.valid {
            cf_utils::ExitCode::SUCCESS
        } else {
            cf_utils::ExitCode::VALIDATION_FAILURE
        }
    }
}

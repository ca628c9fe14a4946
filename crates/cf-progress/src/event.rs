//! Progress event schema.

use cf_utils::{ModuleId, RunId, StageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status carried by a progress event. Multiple `Warning` events
/// never overwrite the stage's lifecycle status - only
/// `Started`/`Done`/`Failed` are terminal-relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Started,
    Progress,
    Warning,
    Done,
    Failed,
}

impl ProgressStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One line of the `pipeline_events.jsonl` log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub timestamp: DateTime<Utc>,
    pub run_id: RunId,
    pub stage: StageId,
    pub status: ProgressStatus,
    pub module_id: ModuleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(run_id: RunId, stage: StageId, module_id: ModuleId, status: ProgressStatus) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            stage,
            status,
            module_id,
            current: None,
            total: None,
            percent: None,
            message: None,
            artifact: None,
            schema_version: None,
            stage_description: None,
            extra: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_progress(mut self, current: u64, total: u64) -> Self {
        self.current = Some(current);
        self.total = Some(total);
        self.percent = Some((current as f64 / total.max(1) as f64) * 100.0);
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<String>, schema_version: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self.schema_version = Some(schema_version.into());
        self
    }

    /// Required-field well-formedness check the sink enforces before
    /// appending.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.run_id.as_str().is_empty() && !self.stage.as_str().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_event_passes() {
        let event = ProgressEvent::new(
            RunId::new("run-1"),
            StageId::new("ocr"),
            ModuleId::new("ocr_v1"),
            ProgressStatus::Started,
        );
        assert!(event.is_well_formed());
    }

    #[test]
    fn with_progress_computes_percent() {
        let event = ProgressEvent::new(
            RunId::new("run-1"),
            StageId::new("ocr"),
            ModuleId::new("ocr_v1"),
            ProgressStatus::Progress,
        )
        .with_progress(5, 10);
        assert_eq!(event.percent, Some(50.0));
    }

    #[test]
    fn warning_is_not_terminal() {
        assert!(!ProgressStatus::Warning.is_terminal());
        assert!(ProgressStatus::Done.is_terminal());
        assert!(ProgressStatus::Failed.is_terminal());
    }
}

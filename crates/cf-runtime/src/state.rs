//! Pipeline state: the single JSON document tracking every
//! stage's lifecycle across a run.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use cf_utils::{RunId, SchemaName, StageId};
use serde::{Deserialize, Serialize};

/// A stage's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Done,
    Failed,
    Skipped,
    Crashed,
}

impl StageStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped | Self::Crashed)
    }

    /// Whether a downstream stage may treat this as satisfying a `needs`
    /// edge.
    #[must_use]
    pub fn satisfies_dependency(self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

/// One stage's recorded state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageState {
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub artifact: Option<Utf8PathBuf>,
    pub schema_version: Option<SchemaName>,
    #[serde(default)]
    pub input_hashes: HashMap<String, String>,
    pub status_reason: Option<String>,
}

impl StageState {
    #[must_use]
    pub fn pending() -> Self {
        Self {
            status: StageStatus::Pending,
            started_at: None,
            ended_at: None,
            artifact: None,
            schema_version: None,
            input_hashes: HashMap::new(),
            status_reason: None,
        }
    }
}

/// The full per-run state document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub run_id: RunId,
    pub stages: HashMap<StageId, StageState>,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    #[must_use]
    pub fn new(run_id: RunId, stage_ids: &[StageId], started_at: DateTime<Utc>) -> Self {
        let stages = stage_ids
            .iter()
            .map(|id| (id.clone(), StageState::pending()))
            .collect();
        Self {
            run_id,
            stages,
            status: StageStatus::Pending,
            started_at,
            ended_at: None,
        }
    }

    pub fn load(path: &camino::Utf8Path) -> Result<Self, cf_utils::error::CoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &camino::Utf8Path) -> Result<(), cf_utils::error::CoreError> {
        let json = serde_json::to_vec_pretty(self)?;
        cf_utils::atomic_write::write_file_atomic(path, &json)?;
        Ok(())
    }

    /// Whether every one of `needs` has already reached a
    /// dependency-satisfying status.
    #[must_use]
    pub fn needs_satisfied(&self, needs: &[StageId]) -> bool {
        needs.iter().all(|id| {
            self.stages
                .get(id)
                .is_some_and(|s| s.status.satisfies_dependency())
        })
    }
}

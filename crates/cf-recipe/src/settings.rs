//! Settings overlay: an optional, operator-local YAML file that can nudge
//! a recipe's parameters without editing the recipe itself.

use std::collections::HashMap;

use cf_utils::error::CoreError;
use cf_utils::StageId;
use serde::{Deserialize, Serialize};

use crate::params::Params;

/// Per-stage param overrides plus recipe-wide default overrides, both
/// merged in ahead of the recipe's own `default_params`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub default_params: Params,
    #[serde(default)]
    pub stages: HashMap<StageId, Params>,
}

impl Settings {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_yaml(content: &str) -> Result<Self, CoreError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &camino::Utf8Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Overrides declared for one stage, if any.
    #[must_use]
    pub fn for_stage(&self, stage_id: &StageId) -> Params {
        self.stages.get(stage_id).cloned().unwrap_or_default()
    }
}

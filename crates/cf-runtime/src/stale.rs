//! Stale-input detection: did a stage's recorded input hashes change
//! since the state that produced them was written.

use std::collections::{HashMap, HashSet};

use camino::Utf8Path;
use cf_utils::StageId;

use crate::state::PipelineState;

/// Hash every input file for a stage, keyed by its filename, the same
/// shape recorded in [`crate::state::StageState::input_hashes`].
pub fn hash_inputs(paths: &[&Utf8Path]) -> std::io::Result<HashMap<String, String>> {
    let mut hashes = HashMap::with_capacity(paths.len());
    for path in paths {
        let name = path.file_name().unwrap_or(path.as_str()).to_string();
        hashes.insert(name, cf_utils::hashing::hash_file(path)?);
    }
    Ok(hashes)
}

/// Given each stage's current input hashes, determine which stages
/// diverge from what `state` recorded last run. A stage with no prior
/// recorded state is not considered stale by this check alone — that is
/// governed by `--skip-done` in [`crate::decision`].
#[must_use]
pub fn stale_stages(
    current_hashes: &HashMap<StageId, HashMap<String, String>>,
    state: Option<&PipelineState>,
) -> HashSet<StageId> {
    let Some(state) = state else {
        return HashSet::new();
    };
    current_hashes
        .iter()
        .filter(|(stage_id, hashes)| {
            state
                .stages
                .get(stage_id)
                .is_some_and(|recorded| &recorded.input_hashes != *hashes)
        })
        .map(|(stage_id, _)| stage_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cf_utils::RunId;

    #[test]
    fn matching_hashes_are_not_stale() {
        let mut state = PipelineState::new(RunId::new("r1"), &[StageId::new("b")], Utc::now());
        state.stages.get_mut(&StageId::new("b")).unwrap().input_hashes =
            HashMap::from([("pages.jsonl".to_string(), "abc".to_string())]);
        let current = HashMap::from([(
            StageId::new("b"),
            HashMap::from([("pages.jsonl".to_string(), "abc".to_string())]),
        )]);
        assert!(stale_stages(&current, Some(&state)).is_empty());
    }

    #[test]
    fn changed_hash_marks_stage_stale() {
        let mut state = PipelineState::new(RunId::new("r1"), &[StageId::new("b")], Utc::now());
        state.stages.get_mut(&StageId::new("b")).unwrap().input_hashes =
            HashMap::from([("pages.jsonl".to_string(), "abc".to_string())]);
        let current = HashMap::from([(
            StageId::new("b"),
            HashMap::from([("pages.jsonl".to_string(), "def".to_string())]),
        )]);
        let stale = stale_stages(&current, Some(&state));
        assert!(stale.contains(&StageId::new("b")));
    }

    #[test]
    fn no_prior_state_yields_no_stale_stages() {
        let current = HashMap::from([(StageId::new("b"), HashMap::new())]);
        assert!(stale_stages(&current, None).is_empty());
    }
}

//! Resume / Force / Invalidation Controller.
//!
//! A pure function over a stage's prior state, the resume flags, and
//! whether its inputs are stale, deciding whether the Runtime should run,
//! skip, or invalidate-and-rerun each stage. Kept free of I/O so it can be
//! tested exhaustively without touching a run directory.

use std::collections::{HashMap, HashSet};

use cf_utils::StageId;

use crate::state::{PipelineState, StageStatus};

/// What the Runtime should do with one stage this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDecision {
    /// Launch the module.
    Run,
    /// Leave the stage's existing artifact and state entry untouched.
    Skip,
    /// An upstream stage changed; this stage's cached output can no
    /// longer be trusted, so re-run it even though it was previously
    /// `done`.
    Invalidate,
}

impl StageDecision {
    #[must_use]
    pub fn runs_module(self) -> bool {
        matches!(self, Self::Run | Self::Invalidate)
    }
}

/// The `--start-from` / `--end-at` / `--skip-done` / `--force` /
/// `--keep-downstream` resume-policy knobs.
#[derive(Debug, Clone, Default)]
pub struct ResumeOptions {
    pub start_from: Option<StageId>,
    pub end_at: Option<StageId>,
    pub skip_done: bool,
    pub force: bool,
    pub keep_downstream: bool,
}

/// Decide every stage's fate for this invocation, in topological order.
///
/// `needs` maps each stage to its upstream dependencies; `stale` is the
/// set of stages whose recorded input hash no longer matches their
/// current inputs.
#[must_use]
pub fn decide_stages(
    order: &[StageId],
    needs: &HashMap<StageId, Vec<StageId>>,
    state: Option<&PipelineState>,
    opts: &ResumeOptions,
    stale: &HashSet<StageId>,
) -> HashMap<StageId, StageDecision> {
    let mut decisions = HashMap::with_capacity(order.len());
    let mut in_window = opts.start_from.is_none();
    let mut invalidated_upstream: HashSet<StageId> = HashSet::new();

    for stage_id in order {
        if opts.start_from.as_ref() == Some(stage_id) {
            in_window = true;
        }

        let prior_status = state.and_then(|s| s.stages.get(stage_id)).map(|s| s.status);
        let upstream_invalidated = needs
            .get(stage_id)
            .is_some_and(|deps| deps.iter().any(|d| invalidated_upstream.contains(d)));

        let decision = if !in_window {
            StageDecision::Skip
        } else if opts.force && opts.start_from.as_ref() == Some(stage_id) {
            StageDecision::Run
        } else if upstream_invalidated && !opts.keep_downstream {
            StageDecision::Invalidate
        } else if stale.contains(stage_id) {
            StageDecision::Run
        } else if opts.skip_done && prior_status == Some(StageStatus::Done) {
            StageDecision::Skip
        } else {
            StageDecision::Run
        };

        if decision.runs_module() {
            invalidated_upstream.insert(stage_id.clone());
        }
        decisions.insert(stage_id.clone(), decision);

        if opts.end_at.as_ref() == Some(stage_id) {
            in_window = false;
        }
    }

    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cf_utils::RunId;

    fn stage_ids() -> Vec<StageId> {
        vec![StageId::new("a"), StageId::new("b"), StageId::new("c")]
    }

    fn needs_map() -> HashMap<StageId, Vec<StageId>> {
        HashMap::from([
            (StageId::new("a"), vec![]),
            (StageId::new("b"), vec![StageId::new("a")]),
            (StageId::new("c"), vec![StageId::new("b")]),
        ])
    }

    fn done_state() -> PipelineState {
        let mut state = PipelineState::new(RunId::new("r1"), &stage_ids(), Utc::now());
        for stage in state.stages.values_mut() {
            stage.status = StageStatus::Done;
        }
        state
    }

    #[test]
    fn scenario_c_force_reruns_only_named_stage() {
        let opts = ResumeOptions {
            start_from: Some(StageId::new("c")),
            skip_done: true,
            force: true,
            ..Default::default()
        };
        let decisions = decide_stages(&stage_ids(), &needs_map(), Some(&done_state()), &opts, &HashSet::new());
        assert_eq!(decisions[&StageId::new("a")], StageDecision::Skip);
        assert_eq!(decisions[&StageId::new("b")], StageDecision::Skip);
        assert_eq!(decisions[&StageId::new("c")], StageDecision::Run);
    }

    #[test]
    fn scenario_c_stale_upstream_invalidates_downstream() {
        let opts = ResumeOptions {
            skip_done: true,
            ..Default::default()
        };
        let stale = HashSet::from([StageId::new("a")]);
        let decisions = decide_stages(&stage_ids(), &needs_map(), Some(&done_state()), &opts, &stale);
        assert_eq!(decisions[&StageId::new("a")], StageDecision::Run);
        assert_eq!(decisions[&StageId::new("b")], StageDecision::Invalidate);
        assert_eq!(decisions[&StageId::new("c")], StageDecision::Invalidate);
    }

    #[test]
    fn keep_downstream_suppresses_invalidation() {
        let opts = ResumeOptions {
            skip_done: true,
            keep_downstream: true,
            ..Default::default()
        };
        let stale = HashSet::from([StageId::new("a")]);
        let decisions = decide_stages(&stage_ids(), &needs_map(), Some(&done_state()), &opts, &stale);
        assert_eq!(decisions[&StageId::new("a")], StageDecision::Run);
        assert_eq!(decisions[&StageId::new("b")], StageDecision::Skip);
        assert_eq!(decisions[&StageId::new("c")], StageDecision::Skip);
    }

    #[test]
    fn no_prior_state_runs_everything() {
        let decisions = decide_stages(&stage_ids(), &needs_map(), None, &ResumeOptions::default(), &HashSet::new());
        assert!(decisions.values().all(|d| *d == StageDecision::Run));
    }

    #[test]
    fn end_at_excludes_stages_after_bound() {
        let opts = ResumeOptions {
            end_at: Some(StageId::new("b")),
            ..Default::default()
        };
        let decisions = decide_stages(&stage_ids(), &needs_map(), None, &opts, &HashSet::new());
        assert_eq!(decisions[&StageId::new("c")], StageDecision::Skip);
    }
}

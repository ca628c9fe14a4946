//! Ties the Recipe Loader & Planner, Artifact Store, Schema Registry,
//! Progress Sinks, Module Runtime, Resume Controller, and Patching
//! Sub-layer into a single driver loop:
//!
//! *Recipe → Planner → DAG → (for each stage, resume-controller decides)
//! → Runtime launches module → Runtime applies patches → Validator stamps
//! and validates → Sinks record events, cost, and instrumentation → next
//! stage.*
//!
//! This module is the Runtime (C5) in its role as orchestrator; the
//! subprocess/mock split lives in [`crate::executor`], the per-stage
//! decision in [`crate::decision`], and stamping/validation in `cf_schema`.

use std::collections::HashMap;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::Utc;
use cf_progress::instrumentation::InstrumentationSink;
use cf_progress::{PriceTable, ProgressEvent, ProgressSink, ProgressStatus, StageInstrumentation};
use cf_recipe::{ModuleRegistry, Params, PlannedPipeline, Recipe, Settings};
use cf_schema::SchemaRegistry;
use cf_store::Run;
use cf_utils::error::CoreError;
use cf_utils::{ModuleId, StageId};
use serde_json::Value;
use tracing::{info, warn};

use crate::decision::{decide_stages, ResumeOptions, StageDecision};
use crate::executor::ModuleExecutor;
use crate::jsonl::{read_records, write_records};
use crate::patch::{apply_patches, PatchSet, PatchTiming};
use crate::stale::{hash_inputs, stale_stages};
use crate::state::{PipelineState, StageStatus};

/// Everything one invocation of the driver needs beyond the plan itself.
pub struct PipelineOptions<'a> {
    pub recipe: &'a Recipe,
    pub modules: &'a ModuleRegistry,
    pub schemas: &'a SchemaRegistry,
    pub settings: &'a Settings,
    pub patches: &'a PatchSet,
    pub resume: ResumeOptions,
    pub instrument: bool,
    /// Schema whose stage writes to the run root rather than a stage
    /// subdirectory - the final user-facing artifact stays at the run
    /// root for direct consumption.
    pub terminal_schema: Option<cf_utils::SchemaName>,
    /// Price sheet for instrumentation cost aggregation (`--price-table`);
    /// an empty table contributes zero cost and flags every call unpriced.
    pub price_table: &'a PriceTable,
}

/// What a completed (successful or not) invocation produced.
pub struct PipelineRun {
    pub state: PipelineState,
    /// Path of the terminal artifact, if a terminal-schema stage ran or
    /// was already `done`/`skipped` from a prior invocation.
    pub terminal_artifact: Option<Utf8PathBuf>,
}

/// Run (or resume) a full pipeline invocation against an already-opened
/// run directory and an already-built plan.
pub fn run_pipeline(
    run: &Run,
    plan: &PlannedPipeline,
    opts: &PipelineOptions<'_>,
    executor: &dyn ModuleExecutor,
) -> Result<PipelineRun, CoreError> {
    let _lock = cf_lock::RunLock::acquire(run.root(), run.run_id().as_str())
        .map_err(|e| CoreError::Lock(e.to_string()))?;

    let state_path = run.root().join("pipeline_state.json");
    let progress_path = run.root().join("pipeline_events.jsonl");
    let progress = ProgressSink::new(progress_path);

    let stage_ids: Vec<StageId> = plan.stages.iter().map(|s| s.stage_id.clone()).collect();
    let mut needs: HashMap<StageId, Vec<StageId>> = HashMap::new();
    for stage in &plan.stages {
        needs.insert(stage.stage_id.clone(), stage.needs.clone());
    }

    let prior_state = PipelineState::load(&state_path).ok();
    let started_at = prior_state.as_ref().map_or_else(Utc::now, |s| s.started_at);
    let mut state = prior_state
        .clone()
        .unwrap_or_else(|| PipelineState::new(run.run_id().clone(), &stage_ids, started_at));

    let stale = compute_stale_stages(plan, prior_state.as_ref());
    let decisions = decide_stages(&stage_ids, &needs, Some(&state), &opts.resume, &stale);

    let mut stage_instrumentation: Vec<StageInstrumentation> = Vec::new();
    let mut terminal_artifact: Option<Utf8PathBuf> = None;
    let mut failure: Option<CoreError> = None;

    for planned in &plan.stages {
        let decision = decisions[&planned.stage_id];
        let manifest = opts
            .modules
            .get(&planned.module_id)
            .ok_or_else(|| CoreError::Configuration(format!("unknown module '{}'", planned.module_id)))?;

        let is_terminal = opts.terminal_schema.as_ref() == Some(&planned.output_schema);
        let artifact_path = if is_terminal {
            run.terminal_artifact_path(&planned.output_filename)
        } else {
            run.artifact_path(planned.ordinal, &planned.module_id, &planned.output_filename)?
        };

        if decision == StageDecision::Skip {
            if is_terminal && artifact_path.exists() {
                terminal_artifact = Some(artifact_path);
            }
            continue;
        }

        if failure.is_some() {
            // An earlier stage already failed; downstream stages stay
            // pending/blocked rather than running.
            continue;
        }

        if decision == StageDecision::Invalidate || opts.resume.force {
            run.cleanup_artifact(&artifact_path)?;
            state.stages.insert(planned.stage_id.clone(), crate::state::StageState::pending());
        }

        info!(stage = %planned.stage_id, module = %planned.module_id, "running stage");
        match run_one_stage(
            run,
            planned,
            manifest,
            &artifact_path,
            opts,
            &progress,
            &needs,
            &mut state,
            executor,
        ) {
            Ok(instrumentation) => {
                if let Some(agg) = instrumentation {
                    stage_instrumentation.push(agg);
                }
                if is_terminal {
                    terminal_artifact = Some(artifact_path);
                }
            }
            Err(e) => {
                failure = Some(e);
            }
        }
    }

    state.status = if failure.is_some() {
        StageStatus::Failed
    } else {
        StageStatus::Done
    };
    state.ended_at = Some(Utc::now());
    state.save(&state_path)?;

    if opts.instrument {
        write_instrumentation_report(run, &stage_instrumentation)?;
    }

    if let Some(err) = failure {
        return Err(err);
    }

    Ok(PipelineRun { state, terminal_artifact })
}

/// Run a single stage end to end: resolve params, apply `before` patches,
/// execute, stamp+validate the output, apply `after` patches, and record
/// state/progress/instrumentation.
///
/// Returns the stage's aggregated instrumentation, if any sink was
/// populated.
#[allow(clippy::too_many_arguments)]
fn run_one_stage(
    run: &Run,
    planned: &cf_recipe::PlannedStage,
    manifest: &cf_recipe::ModuleManifest,
    artifact_path: &Utf8PathBuf,
    opts: &PipelineOptions<'_>,
    progress: &ProgressSink,
    needs: &HashMap<StageId, Vec<StageId>>,
    state: &mut PipelineState,
    executor: &dyn ModuleExecutor,
) -> Result<Option<StageInstrumentation>, CoreError> {
    let stage_spec = opts
        .recipe
        .stage(&planned.stage_id)
        .expect("planned stage always has a matching recipe stage");

    // Settings sit between module defaults and recipe defaults in the
    // precedence chain (cf_recipe::settings): a settings overlay can nudge
    // defaults without editing the recipe, but the recipe's own
    // `default_params` and a stage's explicit `params` still win.
    let settings_layer = merged(&opts.settings.default_params, &opts.settings.for_stage(&planned.stage_id));
    let recipe_defaults = merged(&settings_layer, &opts.recipe.default_params);
    let params = cf_recipe::params::resolve_params(
        &manifest.default_params,
        &recipe_defaults,
        &stage_spec.params,
        &manifest.param_schema,
        planned.stage_id.as_str(),
        planned.module_id.as_str(),
    )?;

    let dep_ids = needs.get(&planned.stage_id).cloned().unwrap_or_default();
    let mut inputs = Vec::with_capacity(dep_ids.len());
    for dep_id in &dep_ids {
        let dep_state = state
            .stages
            .get(dep_id)
            .and_then(|s| s.artifact.clone())
            .ok_or_else(|| {
                CoreError::Configuration(format!(
                    "stage '{}' needs '{}' but it has no recorded artifact",
                    planned.stage_id, dep_id
                ))
            })?;
        inputs.push(dep_state);
    }

    let instrumentation_sink = opts
        .instrument
        .then(|| run.artifact_path(planned.ordinal, &planned.module_id, "instrumentation.jsonl"))
        .transpose()?;

    let invocation = cf_module_api::ModuleInvocation {
        entrypoint: Utf8PathBuf::from_path_buf(manifest.entrypoint.clone())
            .unwrap_or_else(|p| Utf8PathBuf::from(p.to_string_lossy().into_owned())),
        inputs,
        out: artifact_path.clone(),
        state_file: run.root().join("pipeline_state.json"),
        progress_file: progress.path().to_owned(),
        run_id: run.run_id().clone(),
        instrumentation_sink: instrumentation_sink.clone(),
        params,
    };

    let started_at = Utc::now();
    state.stages.insert(
        planned.stage_id.clone(),
        crate::state::StageState {
            status: StageStatus::Running,
            started_at: Some(started_at),
            ended_at: None,
            artifact: None,
            schema_version: None,
            input_hashes: HashMap::new(),
            status_reason: None,
        },
    );
    progress.append(&ProgressEvent::new(
        run.run_id().clone(),
        planned.stage_id.clone(),
        planned.module_id.clone(),
        ProgressStatus::Started,
    ))?;

    apply_before_patches(opts.patches, &planned.module_id, &invocation.inputs)?;

    let outcome = executor
        .execute(&invocation, manifest)
        .map_err(|e| CoreError::ModuleFailure {
            stage: planned.stage_id.to_string(),
            module: planned.module_id.to_string(),
            reason: e.to_string(),
        })?;

    match outcome.status {
        StageStatus::Crashed => {
            finalize_stage(state, &planned.stage_id, StageStatus::Crashed, outcome.status_reason.clone());
            progress.append(
                &ProgressEvent::new(run.run_id().clone(), planned.stage_id.clone(), planned.module_id.clone(), ProgressStatus::Failed)
                    .with_message(outcome.status_reason.clone().unwrap_or_default()),
            )?;
            return Err(CoreError::Crashed {
                stage: planned.stage_id.to_string(),
            });
        }
        StageStatus::Failed => {
            finalize_stage(state, &planned.stage_id, StageStatus::Failed, outcome.status_reason.clone());
            progress.append(
                &ProgressEvent::new(run.run_id().clone(), planned.stage_id.clone(), planned.module_id.clone(), ProgressStatus::Failed)
                    .with_message(outcome.status_reason.clone().unwrap_or_default()),
            )?;
            return Err(CoreError::ModuleFailure {
                stage: planned.stage_id.to_string(),
                module: planned.module_id.to_string(),
                reason: outcome.status_reason.unwrap_or_default(),
            });
        }
        StageStatus::Done => {}
        StageStatus::Pending | StageStatus::Running | StageStatus::Skipped => unreachable!(
            "executor outcomes are only ever Done, Failed, or Crashed"
        ),
    }

    let raw_records = read_records(artifact_path)?;
    let as_maps: Result<Vec<serde_json::Map<String, Value>>, CoreError> = raw_records
        .into_iter()
        .map(|v| {
            v.as_object()
                .cloned()
                .ok_or_else(|| CoreError::ArtifactValidation {
                    schema: planned.output_schema.to_string(),
                    reason: "artifact record is not a JSON object".to_string(),
                })
        })
        .collect();
    let stamped = cf_schema::stamp::stamp_records(
        opts.schemas,
        &planned.output_schema,
        &planned.module_id,
        run.run_id(),
        Utc::now(),
        as_maps?,
    )
    .map_err(|reason| CoreError::ArtifactValidation {
        schema: planned.output_schema.to_string(),
        reason,
    })?;
    let mut stamped_values: Vec<Value> = stamped.into_iter().map(Value::Object).collect();

    stamped_values = apply_after_patches(opts.patches, &planned.module_id, stamped_values)?;
    write_records(artifact_path, &stamped_values)?;

    let validation = cf_schema::validate::validate_records(opts.schemas, &planned.output_schema, &stamped_values)
        .map_err(|reason| CoreError::ArtifactValidation {
            schema: planned.output_schema.to_string(),
            reason,
        })?;
    if !validation.is_ok() {
        let reason = validation
            .errors
            .iter()
            .map(|e| e.message.clone())
            .collect::<Vec<_>>()
            .join("; ");
        finalize_stage(state, &planned.stage_id, StageStatus::Failed, Some(reason.clone()));
        progress.append(
            &ProgressEvent::new(run.run_id().clone(), planned.stage_id.clone(), planned.module_id.clone(), ProgressStatus::Failed)
                .with_message(reason.clone()),
        )?;
        return Err(CoreError::ArtifactValidation {
            schema: planned.output_schema.to_string(),
            reason,
        });
    }

    let input_paths: Vec<&camino::Utf8Path> = invocation.inputs.iter().map(|p| p.as_path()).collect();
    let input_hashes = hash_inputs(&input_paths)?;

    if let Some(entry) = state.stages.get_mut(&planned.stage_id) {
        entry.status = StageStatus::Done;
        entry.ended_at = Some(Utc::now());
        entry.artifact = Some(artifact_path.clone());
        entry.schema_version = Some(planned.output_schema.clone());
        entry.input_hashes = input_hashes;
        entry.status_reason = None;
    }
    progress.append(
        &ProgressEvent::new(run.run_id().clone(), planned.stage_id.clone(), planned.module_id.clone(), ProgressStatus::Done)
            .with_artifact(artifact_path.as_str(), planned.output_schema.as_str()),
    )?;

    let stage_agg = instrumentation_sink
        .as_ref()
        .map(|sink_path| {
            let sink = InstrumentationSink::new(sink_path.clone());
            let calls = sink.read_all().unwrap_or_default();
            cf_progress::instrumentation::aggregate_stage(&planned.stage_id, &calls, opts.price_table)
        })
        .filter(|agg| agg.calls > 0);

    Ok(stage_agg)
}

fn finalize_stage(state: &mut PipelineState, stage_id: &StageId, status: StageStatus, reason: Option<String>) {
    if let Some(entry) = state.stages.get_mut(stage_id) {
        entry.status = status;
        entry.ended_at = Some(Utc::now());
        entry.status_reason = reason;
    }
}

fn merged(base: &Params, overrides: &Params) -> Params {
    let mut out = base.clone();
    out.extend(overrides.clone());
    out
}

fn apply_before_patches(patches: &PatchSet, module_id: &ModuleId, inputs: &[Utf8PathBuf]) -> Result<(), CoreError> {
    let ops = patches.for_module(module_id, PatchTiming::Before);
    if ops.is_empty() {
        return Ok(());
    }
    for input in inputs {
        if let Err(e) = patch_artifact_in_place(input, &ops) {
            warn!(module = %module_id, artifact = %input, error = %e, "before-patch failed to apply; continuing");
        }
    }
    Ok(())
}

fn apply_after_patches(patches: &PatchSet, module_id: &ModuleId, records: Vec<Value>) -> Result<Vec<Value>, CoreError> {
    let ops = patches.for_module(module_id, PatchTiming::After);
    if ops.is_empty() {
        return Ok(records);
    }
    let document = Value::Array(records.clone());
    match apply_patches(&document, &ops) {
        Ok(Value::Array(patched)) => Ok(patched),
        Ok(_) => Ok(records),
        Err(e) => {
            warn!(module = %module_id, error = %e, "after-patch failed to apply; continuing with unpatched output");
            Ok(records)
        }
    }
}

fn patch_artifact_in_place(path: &Utf8PathBuf, ops: &[&crate::patch::PatchOperation]) -> Result<(), String> {
    let records = read_records(path).map_err(|e| e.to_string())?;
    let document = Value::Array(records);
    let patched = apply_patches(&document, ops)?;
    let Value::Array(records) = patched else {
        return Err("patch produced a non-array document for a JSONL artifact".to_string());
    };
    write_records(path, &records).map_err(|e| e.to_string())
}

/// Re-hash every stage's recorded upstream artifacts against what the
/// prior invocation's state recorded, surfacing any stage whose inputs
/// were edited on disk since.
fn compute_stale_stages(plan: &PlannedPipeline, prior: Option<&PipelineState>) -> std::collections::HashSet<StageId> {
    let Some(prior) = prior else {
        return std::collections::HashSet::new();
    };
    let mut current: HashMap<StageId, HashMap<String, String>> = HashMap::new();
    for stage in &plan.stages {
        let mut input_paths = Vec::new();
        for dep in &stage.needs {
            if let Some(dep_artifact) = prior.stages.get(dep).and_then(|s| s.artifact.clone()) {
                input_paths.push(dep_artifact);
            }
        }
        if input_paths.is_empty() {
            continue;
        }
        let borrowed: Vec<&camino::Utf8Path> = input_paths.iter().map(|p| p.as_path()).collect();
        if let Ok(hashes) = hash_inputs(&borrowed) {
            current.insert(stage.stage_id.clone(), hashes);
        }
    }
    stale_stages(&current, Some(prior))
}

fn write_instrumentation_report(run: &Run, stages: &[StageInstrumentation]) -> Result<(), CoreError> {
    let total = cf_progress::instrumentation::aggregate_run(stages);
    let json_path = run.terminal_artifact_path("instrumentation.json");
    let md_path = run.terminal_artifact_path("instrumentation.md");
    cf_progress::report::write_json(&json_path, stages, &total)?;
    cf_progress::report::write_markdown(&md_path, stages, &total)?;
    Ok(())
}

/// Default `--stall-timeout-secs`, shared with `cf-cli` so the clap default
/// and the watchdog's own assumption can't drift apart.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(900);

//! Command-line driver for codex-forge.
//!
//! Four subcommands sit directly over the library crates: `run` drives a
//! fresh (or reused) invocation end to end, `plan` resolves and prints a
//! DAG without touching disk, `resume` re-enters an existing run with the
//! resume-policy knobs, and `validate` runs the Final Validation Gate
//! against an already-produced terminal artifact. All of them bottom out
//! in `cf_runtime::run_pipeline`; this crate's job is argument parsing,
//! wiring the concrete paths together, and mapping `CoreError` to an exit
//! code.

use std::collections::HashSet;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cf_progress::PriceTable;
use cf_recipe::{ModuleRegistry, PlannedPipeline, Recipe, Settings};
use cf_runtime::{
    patch::PatchSet,
    pipeline::{run_pipeline, PipelineOptions},
    ResumeOptions,
};
use cf_schema::SchemaRegistry;
use cf_store::{Run, ReusePolicy};
use cf_utils::error::CoreError;
use cf_utils::{ExitCode, RunId, SchemaName, StageId};

/// codex-forge - recipe-driven gamebook extraction pipeline driver.
#[derive(Parser)]
#[command(name = "codex-forge")]
#[command(about = "Run, plan, resume, and validate gamebook extraction pipelines")]
#[command(long_about = r#"
codex-forge drives a recipe of OCR/cleanup/extraction modules through a
schema-checked, resumable DAG, ending in a single validated gamebook
document.

EXAMPLES:
  # Run a recipe end to end against deterministic mock modules
  codex-forge run --recipe recipe.yaml --modules modules/ --output-dir runs/ --mock

  # Inspect the planned stage order without creating a run directory
  codex-forge plan --recipe recipe.yaml --modules modules/ --dump-plan

  # Resume a run from a specific stage, skipping already-done work
  codex-forge resume --run-id 20260415T120000Z-abcd1234 --recipe recipe.yaml \
      --modules modules/ --output-dir runs/ --start-from detect_boundaries --skip-done

  # Certify an already-produced document is game-ready
  codex-forge validate --artifact runs/20260415T120000Z-abcd1234/gamebook.json
"#)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug-level) tracing output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute a recipe against a fresh or explicitly-reused run directory.
    Run(RunArgs),
    /// Resolve a recipe's DAG and print it, without creating a run directory.
    Plan(PlanArgs),
    /// Re-enter an existing run directory with resume-policy flags.
    Resume(ResumeArgs),
    /// Run the Final Validation Gate against a standalone artifact file.
    Validate(ValidateArgs),
}

/// Inputs shared by every subcommand that resolves a recipe into a plan.
#[derive(clap::Args, Debug, Clone)]
pub struct RecipeArgs {
    /// Recipe file.
    #[arg(long)]
    pub recipe: PathBuf,

    /// Settings overlay merged into the recipe's own defaults.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Directory of `*.module.yaml` manifests.
    #[arg(long, default_value = "modules")]
    pub modules: PathBuf,
}

/// The shared run parent the manifest is authoritative for. `--output-dir`
/// values that canonicalize to something other than this directory are
/// temporary/ad hoc (per spec.md's "Temporary runs (output dir outside the
/// canonical parent) are NOT registered") and are skipped when the run
/// manifest is appended to.
const DEFAULT_CANONICAL_OUTPUT_DIR: &str = "runs";

/// Inputs shared by `run` and `resume`: where the run lives and how its
/// side channels (instrumentation, patches, mock execution) are wired.
#[derive(clap::Args, Debug, Clone)]
pub struct ExecutionArgs {
    /// Explicit run id; auto-generated (`RunId::generate`) when omitted.
    #[arg(long)]
    pub run_id: Option<String>,

    /// Parent directory of the run directory.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// The canonical, manifest-registered run parent, used to decide
    /// whether this invocation's `--output-dir` is temporary (defaults to
    /// `runs`). `--force` is refused when `--output-dir` canonicalizes to
    /// this directory; a forced re-run must target a dedicated, non-shared
    /// output directory instead.
    #[arg(long)]
    pub canonical_output_dir: Option<PathBuf>,

    /// Permit attaching to an already-existing run directory.
    #[arg(long)]
    pub allow_run_id_reuse: bool,

    /// The primary input (the scanned or born-digital book) the first
    /// stage(s) consume. When set, the Runtime probes for a
    /// `<book_name>.patch.json` sidecar next to it (spec.md §4.5) and
    /// folds it into the patch set alongside anything named by `--patch`.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// JSON Merge Patch sidecar applied around named modules.
    #[arg(long)]
    pub patch: Option<PathBuf>,

    /// Record per-call LLM usage and write a cost report alongside the run.
    #[arg(long)]
    pub instrument: bool,

    /// Price sheet (YAML) used to cost instrumentation calls.
    #[arg(long)]
    pub price_table: Option<PathBuf>,

    /// Substitute deterministic stubs for every module.
    #[arg(long)]
    pub mock: bool,

    /// Seconds a stage's progress file may go untouched before the
    /// watchdog declares it crashed.
    #[arg(long, default_value_t = cf_runtime::DEFAULT_STALL_TIMEOUT.as_secs())]
    pub stall_timeout_secs: u64,
}

/// The `--start-from` / `--end-at` / `--skip-done` / `--force` /
/// `--keep-downstream` resume-policy knobs.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ResumePolicyArgs {
    #[arg(long)]
    pub start_from: Option<String>,
    #[arg(long)]
    pub end_at: Option<String>,
    #[arg(long)]
    pub skip_done: bool,
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub keep_downstream: bool,
}

impl ResumePolicyArgs {
    fn into_options(self) -> ResumeOptions {
        ResumeOptions {
            start_from: self.start_from.map(|s| StageId::new(s)),
            end_at: self.end_at.map(|s| StageId::new(s)),
            skip_done: self.skip_done,
            force: self.force,
            keep_downstream: self.keep_downstream,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,
    #[command(flatten)]
    pub execution: ExecutionArgs,
    #[command(flatten)]
    pub resume_policy: ResumePolicyArgs,

    /// Resolve and print the plan, then exit without running anything.
    #[arg(long)]
    pub dump_plan: bool,

    /// Resolve the plan and report what would run, without executing or
    /// creating a run directory.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ResumeArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,
    #[command(flatten)]
    pub execution: ExecutionArgs,
    #[command(flatten)]
    pub resume_policy: ResumePolicyArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Terminal artifact to certify (a single JSON document, not JSONL).
    #[arg(long)]
    pub artifact: PathBuf,
}

/// Parse arguments, initialize tracing, dispatch to a subcommand, and map
/// any failure onto `CoreError::is_usage_error`'s exit code. `main.rs`
/// only needs to call this and translate the `Err` to `process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => run_command(args),
        Command::Plan(args) => plan_command(args),
        Command::Resume(args) => resume_command(args),
        Command::Validate(args) => validate_command(args),
    };

    result.map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from_error(&err)
    })
}

fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("codex_forge=debug,info")
            } else {
                EnvFilter::try_new("codex_forge=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(verbose).with_file(false).with_line_number(false).compact())
        .try_init();
}

fn to_utf8(path: PathBuf, label: &str) -> Result<Utf8PathBuf, CoreError> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|p| CoreError::Configuration(format!("{label} path is not valid UTF-8: {}", p.display())))
}

fn schema_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    cf_schema::builtin::register_builtin_schemas(&mut registry);
    registry
}

/// Load the recipe, settings overlay, and module registry named by
/// `args`, then build the topologically-sorted plan.
fn load_plan(args: &RecipeArgs) -> Result<(Recipe, Settings, ModuleRegistry, PlannedPipeline), CoreError> {
    let recipe_path = to_utf8(args.recipe.clone(), "--recipe")?;
    let recipe = Recipe::load(&recipe_path)?;

    let settings = match &args.settings {
        Some(path) => Settings::load(&to_utf8(path.clone(), "--settings")?)?,
        None => Settings::empty(),
    };

    let modules = ModuleRegistry::load_from_dir(&args.modules)?;
    let plan = cf_recipe::plan::build_plan(&recipe, &modules)?;

    Ok((recipe, settings, modules, plan))
}

/// The plan's unique sink stage: a stage whose id never appears in any
/// other stage's `needs`. Its output schema is the terminal artifact
///; a branching DAG that
/// merges back into one assembly stage still has exactly one sink.
fn terminal_schema(plan: &PlannedPipeline) -> Option<SchemaName> {
    let consumed: HashSet<&StageId> = plan.stages.iter().flat_map(|s| s.needs.iter()).collect();
    plan.stages
        .iter()
        .rev()
        .find(|s| !consumed.contains(&s.stage_id))
        .map(|s| s.output_schema.clone())
}

fn plan_command(args: PlanArgs) -> Result<(), CoreError> {
    let (_, _, _, plan) = load_plan(&args.recipe)?;
    let printed = serde_json::to_string_pretty(&plan)?;
    println!("{printed}");
    Ok(())
}

/// The directory `--output-dir` is compared against to decide whether a
/// run is temporary (§ [`DEFAULT_CANONICAL_OUTPUT_DIR`]) or, for `--force`,
/// whether the target is the shared canonical parent rather than a
/// dedicated directory.
fn canonical_output_dir(exec: &ExecutionArgs) -> Result<Utf8PathBuf, CoreError> {
    match &exec.canonical_output_dir {
        Some(path) => to_utf8(path.clone(), "--canonical-output-dir"),
        None => Ok(Utf8PathBuf::from(DEFAULT_CANONICAL_OUTPUT_DIR)),
    }
}

/// Testable Property / boundary behavior: "`--force` on the canonical
/// output parent → refused with exit code 2." `--output-dir` is always the
/// *parent* of a run directory, so forcing against it would invalidate
/// whichever run the manifest (and any other process watching it) last
/// recorded there; a forced re-run must instead target a dedicated,
/// non-canonical output directory.
fn check_force_not_on_canonical_parent(exec: &ExecutionArgs, resume: &ResumeOptions) -> Result<(), CoreError> {
    if !resume.force {
        return Ok(());
    }
    let output_dir = to_utf8(exec.output_dir.clone(), "--output-dir")?;
    let canonical = canonical_output_dir(exec)?;
    if cf_store::should_register(&output_dir, &canonical) {
        return Err(CoreError::ForceRefused);
    }
    Ok(())
}

fn run_command(args: RunArgs) -> Result<(), CoreError> {
    let resume = args.resume_policy.clone().into_options();
    if resume.force && args.execution.run_id.is_none() {
        return Err(CoreError::ForceRefused);
    }
    check_force_not_on_canonical_parent(&args.execution, &resume)?;

    let (recipe, settings, modules, plan) = load_plan(&args.recipe)?;

    if args.dump_plan || args.dry_run {
        let printed = serde_json::to_string_pretty(&plan)?;
        println!("{printed}");
        if args.dry_run {
            for stage in &plan.stages {
                info!(stage = %stage.stage_id, module = %stage.module_id, "would run stage");
            }
        }
        return Ok(());
    }

    let reuse = if args.execution.allow_run_id_reuse || resume.force {
        ReusePolicy::AllowExisting
    } else {
        ReusePolicy::MustBeFresh
    };
    execute(&recipe, &settings, &modules, &plan, &args.execution, resume, reuse)
}

fn resume_command(args: ResumeArgs) -> Result<(), CoreError> {
    if args.execution.run_id.is_none() {
        return Err(CoreError::Configuration("resume requires an explicit --run-id".to_string()));
    }

    let resume = args.resume_policy.clone().into_options();
    check_force_not_on_canonical_parent(&args.execution, &resume)?;

    let (recipe, settings, modules, plan) = load_plan(&args.recipe)?;
    // Resuming always targets an already-existing run directory by
    // definition, regardless of `--allow-run-id-reuse`.
    execute(&recipe, &settings, &modules, &plan, &args.execution, resume, ReusePolicy::AllowExisting)
}

/// The `<book_name>.patch.json` sidecar path next to `input`, derived by
/// replacing the primary input's own extension with `.patch.json`
/// (`scans/moonrunner.pdf` -> `scans/moonrunner.patch.json`). Returns
/// `None` when `input` has no filename to derive a book name from.
fn sidecar_patch_path(input: &Utf8Path) -> Option<Utf8PathBuf> {
    let stem = input.file_stem()?;
    Some(input.with_file_name(format!("{stem}.patch.json")))
}

/// Read and parse a patch sidecar (YAML or JSON, whichever parses) at
/// `path`. Shared by both the explicit `--patch` flag and the automatic
/// `<book_name>.patch.json` sidecar probe.
fn load_patch_file(path: &Utf8Path) -> Result<PatchSet, CoreError> {
    let content = std::fs::read_to_string(path.as_std_path())?;
    let parsed: PatchSet = serde_yaml::from_str(&content).or_else(|_| serde_json::from_str(&content))?;
    Ok(parsed)
}

/// Open (or re-attach to) the run directory, snapshot the inputs that
/// shaped this invocation, execute the pipeline, and certify the
/// terminal artifact against the Final Validation Gate.
#[allow(clippy::too_many_arguments)]
fn execute(
    recipe: &Recipe,
    settings: &Settings,
    modules: &ModuleRegistry,
    plan: &PlannedPipeline,
    exec_args: &ExecutionArgs,
    resume: ResumeOptions,
    reuse: ReusePolicy,
) -> Result<(), CoreError> {
    let output_dir = to_utf8(exec_args.output_dir.clone(), "--output-dir")?;
    let run_id = match &exec_args.run_id {
        Some(id) => RunId::new(id.clone()),
        None => RunId::generate(),
    };

    let run = Run::open(run_id, &output_dir, reuse)?;

    snapshot_inputs(&run, recipe, settings, modules, plan)?;

    let mut patches = PatchSet::default();

    // spec.md §4.5: "If a patch file named `<book_name>.patch.json` sits
    // next to the primary input, the Runtime copies it into the run
    // directory." Checked first so an explicit `--patch` below still has
    // the final say over any overlapping operations.
    if let Some(input) = &exec_args.input {
        let input_path = to_utf8(input.clone(), "--input")?;
        if let Some(sidecar) = sidecar_patch_path(&input_path) {
            if sidecar.exists() {
                patches.operations.extend(load_patch_file(&sidecar)?.operations);
            }
        }
    }

    if let Some(path) = &exec_args.patch {
        let patch_path = to_utf8(path.clone(), "--patch")?;
        patches.operations.extend(load_patch_file(&patch_path)?.operations);
    }

    if !patches.operations.is_empty() {
        let snapshot_path = run.root().join("patch.json");
        cf_utils::atomic_write::write_file_atomic(&snapshot_path, serde_json::to_string_pretty(&patches)?.as_bytes())?;
    }

    let price_table = match &exec_args.price_table {
        Some(path) => {
            let price_path = to_utf8(path.clone(), "--price-table")?;
            let content = std::fs::read_to_string(price_path.as_std_path())?;
            if price_path.extension() == Some("toml") {
                PriceTable::parse_toml(&content)
                    .map_err(|e| CoreError::Configuration(format!("--price-table: {e}")))?
            } else {
                PriceTable::parse_yaml(&content)?
            }
        }
        None => PriceTable::empty(),
    };

    let schemas = schema_registry();
    let terminal = terminal_schema(plan);

    let opts = PipelineOptions {
        recipe,
        modules,
        schemas: &schemas,
        settings,
        patches: &patches,
        resume,
        instrument: exec_args.instrument,
        terminal_schema: terminal,
        price_table: &price_table,
    };

    let executor = cf_runtime::select_executor(
        exec_args.mock,
        std::time::Duration::from_secs(exec_args.stall_timeout_secs),
    );

    let outcome = run_pipeline(&run, plan, &opts, executor.as_ref())?;

    // spec.md: "Temporary runs (output dir outside the canonical parent)
    // are NOT registered." An ad hoc `--output-dir` used for a one-off
    // experiment never touches `run_manifest.jsonl`.
    let canonical = canonical_output_dir(exec_args)?;
    if cf_store::should_register(&output_dir, &canonical) {
        let entry = cf_store::RunManifestEntry {
            run_id: run.run_id().clone(),
            relative_path: run.root().as_str().to_string(),
            created_at: cf_utils::time::now_utc(),
            notes: String::new(),
        };
        cf_store::append_manifest(&output_dir, &entry)?;
    } else {
        info!(run_id = %run.run_id(), output_dir = %output_dir, "temporary run outside the canonical parent; not registered in run_manifest.jsonl");
    }

    info!(run_id = %run.run_id(), "pipeline finished");

    let Some(artifact_path) = outcome.terminal_artifact else {
        warn!("run finished without producing a terminal artifact");
        return Ok(());
    };

    certify(&artifact_path)
}

fn snapshot_inputs(
    run: &Run,
    recipe: &Recipe,
    settings: &Settings,
    modules: &ModuleRegistry,
    plan: &PlannedPipeline,
) -> Result<(), CoreError> {
    cf_store::write_snapshot(run, cf_store::SnapshotKind::Recipe, serde_yaml::to_string(recipe)?.as_bytes())?;
    cf_store::write_snapshot(run, cf_store::SnapshotKind::Settings, serde_yaml::to_string(settings)?.as_bytes())?;

    // Plan and registry snapshots are canonicalized (JCS, RFC 8785) rather
    // than pretty-printed: re-running the same recipe must produce
    // byte-identical snapshot bytes regardless of any HashMap iteration
    // order that crept into the planner or registry (Testable Property 6).
    cf_store::write_snapshot(run, cf_store::SnapshotKind::Plan, &cf_utils::canonical::to_canonical_json(plan)?)?;

    let registry_json: Vec<&cf_recipe::ModuleManifest> = modules.iter().collect();
    cf_store::write_snapshot(
        run,
        cf_store::SnapshotKind::Registry,
        &cf_utils::canonical::to_canonical_json(&registry_json)?,
    )?;

    Ok(())
}

/// Load the terminal artifact from disk and run the Final Validation Gate
/// against it, mapping a failing report onto `CoreError::FinalValidation`
///.
fn certify(artifact_path: &Utf8Path) -> Result<(), CoreError> {
    let records = cf_runtime::jsonl::read_records(artifact_path)?;
    let document = records.into_iter().next().unwrap_or(serde_json::Value::Null);
    let report = cf_validate::validate(&document);

    let report_path = artifact_path.with_extension("validation.json");
    cf_utils::atomic_write::write_file_atomic(&report_path, serde_json::to_vec_pretty(&report)?.as_slice())?;

    if report.valid {
        info!(errors = 0, warnings = report.warnings.len(), "final validation passed");
        Ok(())
    } else {
        for error in &report.errors {
            warn!(path = %error.path, message = %error.message, "validation error");
        }
        Err(CoreError::FinalValidation(report.errors.len()))
    }
}

fn validate_command(args: ValidateArgs) -> Result<(), CoreError> {
    let artifact_path = to_utf8(args.artifact, "--artifact")?;
    certify(&artifact_path)
}

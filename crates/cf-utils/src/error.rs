//! Aggregate error type for codex-forge.
//!
//! Each crate defines its own `thiserror` enum for the failures only it can
//! produce; `CoreError` is the umbrella type the CLI matches on to decide
//! an exit code and a user-facing message. Library code returns
//! `Result<_, CoreError>` (or a crate-local error wrapped via `#[from]`)
//! and never calls `std::process::exit`.

use thiserror::Error;

/// Top-level error type returned by codex-forge library crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad recipe, missing module, unknown parameter, DAG cycle, or a
    /// `needs` edge whose declared input schema doesn't match the upstream
    /// output schema. Surfaced at plan time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stage parameter failed its param-schema check (type/enum/range/
    /// pattern). Fatal before stage launch.
    #[error(
        "param '{param}' on stage '{stage}' (module {module}) expected {expected}, got {got}"
    )]
    ParamValidation {
        stage: String,
        module: String,
        param: String,
        expected: String,
        got: String,
    },

    /// A module subprocess exited non-zero or raised internally.
    #[error("module '{module}' failed on stage '{stage}': {reason}")]
    ModuleFailure {
        stage: String,
        module: String,
        reason: String,
    },

    /// A module process disappeared without reaching a terminal progress
    /// event or pipeline-state transition.
    #[error("stage '{stage}' crashed: module process disappeared unexpectedly")]
    Crashed { stage: String },

    /// Schema or cross-record invariant validation failed for a stamped
    /// artifact.
    #[error("artifact validation failed for schema '{schema}': {reason}")]
    ArtifactValidation { schema: String, reason: String },

    /// An escalation-capable stage hit its retry cap with unresolved items
    /// and `allow_stubs` was not set.
    #[error(
        "stage '{stage}' has {unresolved} unresolved item(s) after exhausting escalation cap; set allow_stubs to continue"
    )]
    EscalationCapHit { stage: String, unresolved: usize },

    /// The final validation gate found schema, reachability, or target
    /// integrity errors.
    #[error("final validation failed with {0} error(s)")]
    FinalValidation(usize),

    /// Referenced an unknown schema name.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// A run directory already exists and reuse was not explicitly
    /// permitted.
    #[error("run directory already exists: {0}")]
    RunExists(String),

    /// The parent output directory does not exist.
    #[error("output parent directory does not exist: {0}")]
    MissingParentDir(String),

    /// `--force` was given against the canonical output parent rather than
    /// a run-specific directory.
    #[error("--force refused against the canonical run parent; target a specific run directory")]
    ForceRefused,

    /// An out-of-module patch failed to apply. Callers should downgrade
    /// this to a warning event and continue - patches are a last resort,
    /// never a correctness gate - but this variant exists so the attempt
    /// is still typed and logged.
    #[error("patch application failed for module '{module}': {reason}")]
    PatchFailed { module: String, reason: String },

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Run-directory lock is held by another process.
    #[error("lock held: {0}")]
    Lock(String),
}

impl CoreError {
    /// True for errors that originate from bad input (recipe/CLI args)
    /// rather than a runtime failure - used by the CLI to pick the usage
    /// exit code over the crash exit code.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::ParamValidation { .. }
                | Self::RunExists(_)
                | Self::MissingParentDir(_)
                | Self::ForceRefused
                | Self::SchemaNotFound(_)
        )
    }
}

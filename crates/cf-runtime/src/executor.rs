//! The pluggable "how does a module actually run" seam.
//!
//! The default [`SubprocessExecutor`] spawns the module's entrypoint as a
//! real subprocess under [`crate::execute::run_with_watchdog`].
//! [`MockExecutor`] substitutes deterministic, schema-shaped
//! stub output instead of spawning anything, backing the CLI's `--mock`
//! flag: "substitute deterministic stubs for LLM calls (for
//! testing)". Neither the Runtime's decision/stamping/validation logic
//! nor the progress-event sequence differ between the two; only the
//! source of a stage's raw output file changes.

use std::time::Duration;

use cf_module_api::ModuleInvocation;
use cf_recipe::ModuleManifest;
use cf_utils::SchemaName;
use serde_json::{json, Value};

use crate::execute::{run_with_watchdog, StageOutcome};
use crate::jsonl::write_records;
use crate::state::StageStatus;

/// How a stage's module actually produces its raw (unstamped) output.
pub trait ModuleExecutor {
    /// Run `invocation` for the module described by `manifest`, leaving
    /// raw (unstamped) records at `invocation.out`. Returns how the
    /// attempt ended; the caller is responsible for stamping and
    /// validating whatever landed at `out` when the outcome is `Done`.
    fn execute(&self, invocation: &ModuleInvocation, manifest: &ModuleManifest) -> std::io::Result<StageOutcome>;
}

/// Spawns the manifest's real entrypoint as an isolated subprocess.
pub struct SubprocessExecutor {
    pub stall_timeout: Duration,
}

impl SubprocessExecutor {
    #[must_use]
    pub fn new(stall_timeout: Duration) -> Self {
        Self { stall_timeout }
    }
}

impl ModuleExecutor for SubprocessExecutor {
    fn execute(&self, invocation: &ModuleInvocation, _manifest: &ModuleManifest) -> std::io::Result<StageOutcome> {
        let cmd = invocation.to_command();
        run_with_watchdog(cmd, &invocation.progress_file, self.stall_timeout)
    }
}

/// Writes deterministic, schema-shaped stub records instead of invoking a
/// real module. Used behind `--mock` so the DAG, resume, stamping, and
/// final-validation logic can be exercised end to end without external OCR
/// engines or LLM credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockExecutor;

impl ModuleExecutor for MockExecutor {
    fn execute(&self, invocation: &ModuleInvocation, manifest: &ModuleManifest) -> std::io::Result<StageOutcome> {
        let records = mock_records(&manifest.output_schema, &invocation.inputs);
        write_records(&invocation.out, &records)?;
        Ok(StageOutcome {
            status: StageStatus::Done,
            exit_code: Some(0),
            status_reason: None,
        })
    }
}

/// Deterministic stub content for each of the builtin schemas
/// (cf-schema::builtin). A schema with no mock rule yields a single empty
/// object, which fails real validation loudly rather than silently
/// fabricating fields a real schema would require - callers wiring up a
/// new module must teach this function its shape.
fn mock_records(schema: &SchemaName, _inputs: &[camino::Utf8PathBuf]) -> Vec<Value> {
    match schema.as_str() {
        "page_text.v1" => (1..=3)
            .map(|page| json!({"page": page, "text": format!("mock page {page} text"), "confidence": 0.95}))
            .collect(),
        "section_boundary.v1" => (1..=3)
            .map(|id| json!({"section_id": id, "start_page": id, "end_page": id, "confidence": 0.9}))
            .collect(),
        "choice_record.v1" => vec![
            json!({"section_id": 1, "target_section": 2, "text": "Go north"}),
            json!({"section_id": 2, "target_section": 3, "text": "Go south"}),
        ],
        "escalation_resolution.v1" => vec![json!({"item_id": "section-3", "status": "found"})],
        "gamebook.v1" => vec![json!({
            "start_section": "1",
            "sections": {
                "1": {"id": "1", "sequence": [{"type": "choice", "target_section": "2"}]},
                "2": {"id": "2", "sequence": [{"type": "end"}]},
            },
            "metadata": {"section_range": [1, 2]},
        })],
        _ => vec![json!({})],
    }
}

/// Borrow the right executor for whether `--mock` was given.
#[must_use]
pub fn select_executor(mock: bool, stall_timeout: Duration) -> Box<dyn ModuleExecutor> {
    if mock {
        Box::new(MockExecutor)
    } else {
        Box::new(SubprocessExecutor::new(stall_timeout))
    }
}

//! Writers for `instrumentation.json` and the human-readable
//! `instrumentation.md` summary.

use camino::Utf8Path;
use std::io;

use cf_utils::atomic_write::write_str_atomic;
use serde::Serialize;

use crate::instrumentation::StageInstrumentation;

#[derive(Debug, Serialize)]
struct InstrumentationReport<'a> {
    run_total: &'a StageInstrumentation,
    stages: &'a [StageInstrumentation],
}

/// Write `instrumentation.json` at the run root.
pub fn write_json(path: &Utf8Path, stages: &[StageInstrumentation], total: &StageInstrumentation) -> io::Result<()> {
    let report = InstrumentationReport {
        run_total: total,
        stages,
    };
    let json = serde_json::to_string_pretty(&report)?;
    write_str_atomic(path, &json)
}

/// Write `instrumentation.md`, a compact human summary.
pub fn write_markdown(path: &Utf8Path, stages: &[StageInstrumentation], total: &StageInstrumentation) -> io::Result<()> {
    let mut out = String::new();
    out.push_str("# Instrumentation Summary\n\n");
    out.push_str("| Stage | Calls | Prompt tokens | Response tokens | Cost | Unpriced |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for stage in stages {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {:.4} | {} |\n",
            stage.stage, stage.calls, stage.prompt_tokens, stage.response_tokens, stage.cost, stage.unpriced_calls
        ));
    }
    out.push_str(&format!(
        "| **total** | {} | {} | {} | {:.4} | {} |\n",
        total.calls, total.prompt_tokens, total.response_tokens, total.cost, total.unpriced_calls
    ));
    write_str_atomic(path, &out)
}

//! Per-call LLM instrumentation and per-stage/per-run aggregation.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

use cf_utils::atomic_write::append_line;
use cf_utils::StageId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::price::PriceTable;

/// One LLM invocation record, logged via the shared `log_llm_usage` helper
/// every escalation-capable module calls. Zero-usage calls
/// (e.g. refusals) are still recorded so cost aggregation never shows a
/// gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationCall {
    pub stage: StageId,
    pub model: String,
    pub prompt_tokens: u64,
    pub response_tokens: u64,
    pub latency_ms: u64,
}

/// Append-only sink for one stage's instrumentation calls.
#[derive(Debug, Clone)]
pub struct InstrumentationSink {
    path: Utf8PathBuf,
}

impl InstrumentationSink {
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn log_llm_usage(&self, call: &InstrumentationCall) -> io::Result<()> {
        let line = serde_json::to_string(call)?;
        append_line(&self.path, &line)
    }

    pub fn read_all(&self) -> io::Result<Vec<InstrumentationCall>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Aggregated totals for one stage: call count, token totals, and cost
/// (with a per-call-unknown-model warning count so the human summary can
/// flag a price-sheet gap).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageInstrumentation {
    pub stage: String,
    pub calls: usize,
    pub prompt_tokens: u64,
    pub response_tokens: u64,
    pub latency_ms_total: u64,
    pub cost: f64,
    pub unpriced_calls: usize,
}

/// Aggregate a stage's calls against a price table, warning once per
/// unknown model encountered.
#[must_use]
pub fn aggregate_stage(stage: &StageId, calls: &[InstrumentationCall], prices: &PriceTable) -> StageInstrumentation {
    let mut agg = StageInstrumentation {
        stage: stage.as_str().to_string(),
        ..Default::default()
    };
    for call in calls {
        agg.calls += 1;
        agg.prompt_tokens += call.prompt_tokens;
        agg.response_tokens += call.response_tokens;
        agg.latency_ms_total += call.latency_ms;
        match prices.cost_for(&call.model, call.prompt_tokens, call.response_tokens) {
            Some(cost) => agg.cost += cost,
            None => {
                agg.unpriced_calls += 1;
                warn!(model = %call.model, "no price entry for model; contributing zero cost");
            }
        }
    }
    agg
}

/// Aggregate every stage's totals into a run-level total.
#[must_use]
pub fn aggregate_run(stages: &[StageInstrumentation]) -> StageInstrumentation {
    let mut total = StageInstrumentation {
        stage: "__run_total__".to_string(),
        ..Default::default()
    };
    for s in stages {
        total.calls += s.calls;
        total.prompt_tokens += s.prompt_tokens;
        total.response_tokens += s.response_tokens;
        total.latency_ms_total += s.latency_ms_total;
        total.cost += s.cost;
        total.unpriced_calls += s.unpriced_calls;
    }
    total
}

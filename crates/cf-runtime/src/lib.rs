//! Module Runtime, Resume/Force/Invalidation Controller, and Patching
//! Sub-layer.
//!
//! [`pipeline::run_pipeline`] is the top-level driver that composes
//! everything else in this crate (decision, execute, patch, stale, state)
//! with the Recipe/Schema/Store/Progress crates into one pipeline
//! invocation.

pub mod decision;
pub mod execute;
pub mod executor;
pub mod jsonl;
pub mod patch;
pub mod pipeline;
pub mod stale;
pub mod state;

pub use decision::{decide_stages, ResumeOptions, StageDecision};
pub use execute::{run_with_watchdog, StageOutcome};
pub use executor::{select_executor, MockExecutor, ModuleExecutor, SubprocessExecutor};
pub use patch::{apply_patches, PatchOperation, PatchSet, PatchTiming};
pub use pipeline::{run_pipeline, PipelineOptions, PipelineRun, DEFAULT_STALL_TIMEOUT};
pub use stale::{hash_inputs, stale_stages};
pub use state::{PipelineState, StageState, StageStatus};

//! Progress & Instrumentation Sinks.
//!
//! Two append-only logs live here: the progress event log every module
//! invocation is given a path to (`--progress-file`), and the per-call LLM
//! instrumentation sink aggregated into `instrumentation.json`/`.md` at
//! stage end. Both are append-only by construction - nothing in this crate
//! opens a sink file for anything but append.

pub mod event;
pub mod instrumentation;
pub mod price;
pub mod report;
pub mod sink;

pub use event::{ProgressEvent, ProgressStatus};
pub use instrumentation::{InstrumentationCall, StageInstrumentation};
pub use price::PriceTable;
pub use sink::ProgressSink;

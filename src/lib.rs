//! codex-forge - a recipe-driven DAG pipeline runtime that turns
//! scanned or born-digital gamebooks into a validated `gamebook.json`
//! document, passing through OCR/cleanup/extraction modules with
//! resumable, schema-checked stage artifacts at every hop.
//!
//! This root crate is a thin facade over the `cf-*` workspace crates,
//! which hold the actual implementation. The `codex-forge` binary is
//! just [`cli::run`]; depend on the individual `cf-*` crates directly if
//! you only need one piece (e.g. `cf-schema` for the stamping/validation
//! logic without the CLI).

pub use cf_cli as cli;
pub use cf_escalation as escalation;
pub use cf_lock as lock;
pub use cf_module_api as module_api;
pub use cf_progress as progress;
pub use cf_recipe as recipe;
pub use cf_runtime as runtime;
pub use cf_schema as schema;
pub use cf_store as store;
pub use cf_utils as utils;
pub use cf_validate as validate;

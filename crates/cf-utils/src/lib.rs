//! Foundation utilities shared by every codex-forge crate.
//!
//! This crate owns the identifiers, error taxonomy, exit-code mapping,
//! timestamp conventions, and atomic-write discipline that the rest of the
//! workspace builds on. Nothing here talks to a module subprocess or the
//! recipe format; those live in `cf-module-api`/`cf-recipe`/`cf-runtime`.

pub mod atomic_write;
pub mod canonical;
pub mod error;
pub mod exit_codes;
pub mod hashing;
pub mod ids;
pub mod time;

pub use error::CoreError;
pub use exit_codes::ExitCode;
pub use ids::{ModuleId, RunId, SchemaName, StageId};

//! Artifact Store.
//!
//! Owns the on-disk layout of a run: a root directory under a parent
//! output directory, stage-ordinal-prefixed subdirectories for
//! intermediate artifacts, a `snapshots/` directory capturing the inputs
//! that produced the run, and a process-wide `run_manifest.jsonl`
//! recording every non-temporary run.

pub mod manifest;
pub mod run;
pub mod snapshot;

pub use manifest::{append_manifest, should_register, RunManifestEntry};
pub use run::{Run, ReusePolicy};
pub use snapshot::{write_snapshot, SnapshotKind};

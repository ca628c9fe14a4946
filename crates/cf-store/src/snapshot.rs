//! Run-start snapshots: the recipe, resolved plan, module-manifest subset,
//! settings, pricing, and instrumentation config, captured verbatim so a
//! run can be reproduced exactly.

use camino::Utf8PathBuf;
use cf_utils::error::CoreError;

use crate::run::Run;

/// The fixed set of things a run snapshots at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Recipe,
    Plan,
    Registry,
    Settings,
    Pricing,
    Instrumentation,
}

impl SnapshotKind {
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Recipe => "recipe.yaml",
            Self::Plan => "plan.json",
            Self::Registry => "registry.json",
            Self::Settings => "settings.yaml",
            Self::Pricing => "pricing.yaml",
            Self::Instrumentation => "instrumentation_config.json",
        }
    }
}

/// Write one snapshot file into `<run>/snapshots/`.
pub fn write_snapshot(run: &Run, kind: SnapshotKind, content: &[u8]) -> Result<Utf8PathBuf, CoreError> {
    let path = run.snapshots_dir().join(kind.file_name());
    cf_utils::atomic_write::write_file_atomic(&path, content)?;
    Ok(path)
}

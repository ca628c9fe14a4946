//! The run directory itself: creation, artifact paths, and cleanup.

use camino::{Utf8Path, Utf8PathBuf};
use cf_utils::error::CoreError;
use cf_utils::{ModuleId, RunId};

/// Whether `open_run` may attach to an already-existing run directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReusePolicy {
    /// The run directory must not already exist.
    MustBeFresh,
    /// An existing run directory is acceptable (`--allow-run-id-reuse`).
    AllowExisting,
}

/// A run's root directory and the identity that created it.
#[derive(Debug, Clone)]
pub struct Run {
    run_id: RunId,
    root: Utf8PathBuf,
}

impl Run {
    /// Open (and if needed, create) the run directory under `parent_dir`.
    ///
    /// Failure semantics: a missing parent directory is
    /// fatal, as is an existing run directory without explicit reuse
    /// permission.
    pub fn open(run_id: RunId, parent_dir: &Utf8Path, reuse: ReusePolicy) -> Result<Self, CoreError> {
        if !parent_dir.exists() {
            return Err(CoreError::MissingParentDir(parent_dir.to_string()));
        }
        let root = parent_dir.join(run_id.as_str());
        if root.exists() && reuse == ReusePolicy::MustBeFresh {
            return Err(CoreError::RunExists(root.to_string()));
        }
        std::fs::create_dir_all(&root)?;
        std::fs::create_dir_all(root.join("snapshots"))?;
        Ok(Self { run_id, root })
    }

    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    #[must_use]
    pub fn snapshots_dir(&self) -> Utf8PathBuf {
        self.root.join("snapshots")
    }

    /// Directory for one stage's intermediate artifacts, named
    /// `<ordinal:02d>_<module_id>`.
    pub fn stage_dir(&self, ordinal: usize, module_id: &ModuleId) -> Result<Utf8PathBuf, CoreError> {
        let dir = self.root.join(format!("{ordinal:02}_{module_id}"));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Path for one of a stage's artifacts.
    pub fn artifact_path(
        &self,
        ordinal: usize,
        module_id: &ModuleId,
        filename: &str,
    ) -> Result<Utf8PathBuf, CoreError> {
        Ok(self.stage_dir(ordinal, module_id)?.join(filename))
    }

    /// Path for the terminal, user-facing artifact, which lives at the run
    /// root rather than in a stage subdirectory.
    #[must_use]
    pub fn terminal_artifact_path(&self, filename: &str) -> Utf8PathBuf {
        self.root.join(filename)
    }

    /// Delete an artifact ahead of a forced re-run. Missing files are not
    /// an error: cleanup is idempotent.
    pub fn cleanup_artifact(&self, path: &Utf8Path) -> Result<(), CoreError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parent_dir_is_fatal() {
        let err = Run::open(
            RunId::new("r1"),
            Utf8Path::new("/nonexistent/parent"),
            ReusePolicy::MustBeFresh,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingParentDir(_)));
    }

    #[test]
    fn existing_run_without_reuse_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8Path::from_path(dir.path()).unwrap();
        let run_id = RunId::new("r1");
        Run::open(run_id.clone(), parent, ReusePolicy::MustBeFresh).unwrap();
        let err = Run::open(run_id, parent, ReusePolicy::MustBeFresh).unwrap_err();
        assert!(matches!(err, CoreError::RunExists(_)));
    }

    #[test]
    fn reuse_policy_allows_existing_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8Path::from_path(dir.path()).unwrap();
        let run_id = RunId::new("r1");
        Run::open(run_id.clone(), parent, ReusePolicy::MustBeFresh).unwrap();
        Run::open(run_id, parent, ReusePolicy::AllowExisting).unwrap();
    }

    #[test]
    fn stage_dir_uses_zero_padded_ordinal() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8Path::from_path(dir.path()).unwrap();
        let run = Run::open(RunId::new("r1"), parent, ReusePolicy::MustBeFresh).unwrap();
        let stage_dir = run.stage_dir(3, &ModuleId::new("ocr_v1")).unwrap();
        assert!(stage_dir.as_str().ends_with("03_ocr_v1"));
    }

    #[test]
    fn cleanup_artifact_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8Path::from_path(dir.path()).unwrap();
        let run = Run::open(RunId::new("r1"), parent, ReusePolicy::MustBeFresh).unwrap();
        let path = run.artifact_path(0, &ModuleId::new("ocr_v1"), "pages.jsonl").unwrap();
        std::fs::write(&path, b"{}").unwrap();
        run.cleanup_artifact(&path).unwrap();
        run.cleanup_artifact(&path).unwrap();
        assert!(!path.exists());
    }
}

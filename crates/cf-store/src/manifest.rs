//! The process-wide `run_manifest.jsonl` that records every non-temporary
//! run under a canonical parent directory.

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use cf_utils::error::CoreError;
use cf_utils::RunId;
use serde::{Deserialize, Serialize};

/// One line of `run_manifest.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifestEntry {
    pub run_id: RunId,
    pub relative_path: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

/// Append one entry to `<parent_dir>/run_manifest.jsonl`.
///
/// Concurrent drivers racing on the same canonical parent would otherwise
/// interleave appends or clobber each other's rewrite, so the whole
/// read-compose-rewrite is serialized under an exclusive hold on
/// `parent_dir` (the same `cf-lock` primitive `cf-runtime` takes out on a
/// run directory, here scoped to the manifest's own parent instead), and
/// the file itself is replaced via `write_file_atomic`'s temp-then-rename
/// rather than a bare `OpenOptions::append` so a reader never observes a
/// half-written manifest.
pub fn append_manifest(parent_dir: &Utf8Path, entry: &RunManifestEntry) -> Result<(), CoreError> {
    let _lock = cf_lock::RunLock::acquire(parent_dir, "run_manifest")
        .map_err(|e| CoreError::Lock(e.to_string()))?;

    let path = parent_dir.join("run_manifest.jsonl");
    let mut content = std::fs::read_to_string(path.as_std_path()).unwrap_or_default();
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&serde_json::to_string(entry)?);
    content.push('\n');

    cf_utils::atomic_write::write_str_atomic(&path, &content)?;
    Ok(())
}

/// Whether a run under `run_parent` should be recorded in the canonical
/// manifest. Runs whose output directory falls outside the canonical
/// parent (e.g. an ad hoc `--output-dir` for a one-off experiment) are
/// temporary and must not be registered.
#[must_use]
pub fn should_register(run_parent: &Utf8Path, canonical_parent: &Utf8Path) -> bool {
    let run_canon = run_parent.canonicalize_utf8().unwrap_or_else(|_| run_parent.to_owned());
    let canonical = canonical_parent
        .canonicalize_utf8()
        .unwrap_or_else(|_| canonical_parent.to_owned());
    run_canon == canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_read_back_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8Path::from_path(dir.path()).unwrap();
        let entry = RunManifestEntry {
            run_id: RunId::new("r1"),
            relative_path: "r1".to_string(),
            created_at: Utc::now(),
            notes: String::new(),
        };
        append_manifest(parent, &entry).unwrap();
        let content = std::fs::read_to_string(parent.join("run_manifest.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
        let round_tripped: RunManifestEntry = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(round_tripped.run_id, entry.run_id);
    }

    #[test]
    fn second_append_preserves_the_first_entry() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8Path::from_path(dir.path()).unwrap();
        append_manifest(
            parent,
            &RunManifestEntry {
                run_id: RunId::new("r1"),
                relative_path: "r1".to_string(),
                created_at: Utc::now(),
                notes: String::new(),
            },
        )
        .unwrap();
        append_manifest(
            parent,
            &RunManifestEntry {
                run_id: RunId::new("r2"),
                relative_path: "r2".to_string(),
                created_at: Utc::now(),
                notes: String::new(),
            },
        )
        .unwrap();
        let content = std::fs::read_to_string(parent.join("run_manifest.jsonl")).unwrap();
        let ids: Vec<RunId> = content
            .lines()
            .map(|line| serde_json::from_str::<RunManifestEntry>(line).unwrap().run_id)
            .collect();
        assert_eq!(ids, vec![RunId::new("r1"), RunId::new("r2")]);
    }

    #[test]
    fn matching_canonical_parent_should_register() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8Path::from_path(dir.path()).unwrap();
        assert!(should_register(parent, parent));
    }

    #[test]
    fn mismatched_parent_should_not_register() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let a = Utf8Path::from_path(dir_a.path()).unwrap();
        let b = Utf8Path::from_path(dir_b.path()).unwrap();
        assert!(!should_register(a, b));
    }
}

//! Patching Sub-layer.
//!
//! Run-scoped, out-of-module overrides applied by the Runtime immediately
//! before or after a named stage. Patches never touch raw OCR text, only
//! already-structured artifacts, and a patch that fails to apply never
//! fails the run — it degrades to a warning.

use cf_utils::ModuleId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// When a patch runs relative to its target stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchTiming {
    Before,
    After,
}

/// One surgical edit: a JSON Merge Patch (RFC 7396) fragment applied,
/// at the given timing, to the artifact of whichever stage runs the
/// named module (spec.md §4.5: patches are "keyed by `apply_before` or
/// `apply_after` plus a target `module_id`", not a stage id — a patch
/// follows its module wherever the recipe places it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchOperation {
    pub target_module: ModuleId,
    pub timing: PatchTiming,
    pub merge: Value,
}

/// The full patch sidecar for a run, as copied into `patch.json`
///.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchSet {
    #[serde(default)]
    pub operations: Vec<PatchOperation>,
}

impl PatchSet {
    #[must_use]
    pub fn for_module(&self, module_id: &ModuleId, timing: PatchTiming) -> Vec<&PatchOperation> {
        self.operations
            .iter()
            .filter(|op| &op.target_module == module_id && op.timing == timing)
            .collect()
    }
}

/// Apply a chain of merge patches to `document` in order, returning the
/// first error's reason without ever panicking. Callers surface this as a
/// `warning` progress event and continue the run rather than failing it.
pub fn apply_patches(document: &Value, operations: &[&PatchOperation]) -> Result<Value, String> {
    let mut current = document.clone();
    for op in operations {
        current = merge_patch(&current, &op.merge).map_err(|e| {
            format!(
                "patch for module '{}' ({:?}) failed to apply: {e}",
                op.target_module, op.timing
            )
        })?;
    }
    Ok(current)
}

/// RFC 7396 JSON Merge Patch: objects merge key-by-key (a `null` value
/// deletes the key), anything else is replaced wholesale.
fn merge_patch(target: &Value, patch: &Value) -> Result<Value, String> {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            let mut merged = target_map.clone();
            for (key, patch_value) in patch_map {
                if patch_value.is_null() {
                    merged.remove(key);
                } else {
                    let existing = merged.get(key).cloned().unwrap_or(Value::Null);
                    merged.insert(key.clone(), merge_patch(&existing, patch_value)?);
                }
            }
            Ok(Value::Object(merged))
        }
        (_, patch_value) => Ok(patch_value.clone()),
    }
}

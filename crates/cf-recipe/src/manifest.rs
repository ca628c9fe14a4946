//! Module manifests and the registry that indexes them.
//!
//! Per the "dynamic module discovery -> explicit registry" design note
//!, the registry here is a plain `HashMap` populated once at
//! startup, either from a caller-provided list of manifests or by scanning
//! a directory of `module.yaml` files. There is no plugin-loading
//! mechanism.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cf_utils::error::CoreError;
use cf_utils::{ModuleId, SchemaName};
use serde::{Deserialize, Serialize};

use crate::params::{ParamSchema, Params};

/// Declarative description of one module, as spec.md 6.3 defines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub module_id: ModuleId,
    pub entrypoint: PathBuf,
    pub input_schemas: Vec<SchemaName>,
    pub output_schema: SchemaName,
    #[serde(default)]
    pub default_params: Params,
    #[serde(default)]
    pub param_schema: ParamSchema,
    #[serde(default)]
    pub notes: String,
}

/// `module_id -> manifest` lookup built at startup.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<ModuleId, ModuleManifest>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, manifest: ModuleManifest) {
        self.modules.insert(manifest.module_id.clone(), manifest);
    }

    #[must_use]
    pub fn get(&self, module_id: &ModuleId) -> Option<&ModuleManifest> {
        self.modules.get(module_id)
    }

    /// Scan a directory for `*.module.yaml` files and register each one.
    /// Mirrors spec.md 6.3: "The Runtime scans the modules directory at
    /// startup and builds a registry keyed by `module_id`."
    pub fn load_from_dir(dir: &Path) -> Result<Self, CoreError> {
        let mut registry = Self::new();
        if !dir.exists() {
            return Ok(registry);
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yaml")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".module.yaml"))
            {
                let content = std::fs::read_to_string(&path)?;
                let manifest: ModuleManifest = serde_yaml::from_str(&content)?;
                registry.register(manifest);
            }
        }
        Ok(registry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleManifest> {
        self.modules.values()
    }
}

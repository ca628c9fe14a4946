//! Recipe documents: the YAML the operator writes describing which stages
//! to run, in what order, and with which params.

use cf_utils::error::CoreError;
use cf_utils::{ModuleId, SchemaName, StageId};
use serde::{Deserialize, Serialize};

use crate::params::Params;

/// One stage of a recipe: a named step bound to a module, with `needs`
/// edges to upstream stages and stage-local param overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub stage_id: StageId,
    pub module: ModuleId,
    #[serde(default)]
    pub needs: Vec<StageId>,
    #[serde(default)]
    pub params: Params,
    /// Explicit output filename, overriding the recipe/module default
    ///.
    pub out: Option<String>,
}

/// Optional instrumentation block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    #[serde(default)]
    pub enabled: bool,
    pub price_table: Option<String>,
}

/// The full recipe document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub default_params: Params,
    /// `schema_name -> default output filename`, the middle tier of the
    /// output-filename precedence.
    #[serde(default)]
    pub outputs: std::collections::HashMap<SchemaName, String>,
    pub stages: Vec<StageSpec>,
    #[serde(default)]
    pub instrumentation: InstrumentationConfig,
}

impl Recipe {
    pub fn from_yaml(content: &str) -> Result<Self, CoreError> {
        let recipe: Self = serde_yaml::from_str(content)?;
        recipe.validate_shape()?;
        Ok(recipe)
    }

    pub fn load(path: &camino::Utf8Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn stage(&self, stage_id: &StageId) -> Option<&StageSpec> {
        self.stages.iter().find(|s| &s.stage_id == stage_id)
    }

    /// Cheap structural checks that don't require a module registry:
    /// unique stage ids and `needs` referring only to declared stages.
    fn validate_shape(&self) -> Result<(), CoreError> {
        let mut seen = std::collections::HashSet::new();
        for stage in &self.stages {
            if !seen.insert(&stage.stage_id) {
                return Err(CoreError::Configuration(format!(
                    "duplicate stage id '{}' in recipe '{}'",
                    stage.stage_id, self.name
                )));
            }
        }
        for stage in &self.stages {
            for dep in &stage.needs {
                if self.stage(dep).is_none() {
                    return Err(CoreError::Configuration(format!(
                        "stage '{}' needs undeclared stage '{}'",
                        stage.stage_id, dep
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: demo
stages:
  - stage_id: ocr_pages
    module: ocr_v1
  - stage_id: clean_pages
    module: clean_llm_v1
    needs: [ocr_pages]
    params:
      min_conf: 0.8
"#;

    #[test]
    fn parses_minimal_recipe() {
        let recipe = Recipe::from_yaml(SAMPLE).unwrap();
        assert_eq!(recipe.name, "demo");
        assert_eq!(recipe.stages.len(), 2);
        assert_eq!(recipe.stages[1].needs, vec![StageId::new("ocr_pages")]);
    }

    #[test]
    fn rejects_duplicate_stage_ids() {
        let bad = r#"
name: demo
stages:
  - stage_id: a
    module: m1
  - stage_id: a
    module: m2
"#;
        let err = Recipe::from_yaml(bad).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn rejects_undeclared_needs_edge() {
        let bad = r#"
name: demo
stages:
  - stage_id: a
    module: m1
    needs: [ghost]
"#;
        let err = Recipe::from_yaml(bad).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn stage_lookup_by_id() {
        let recipe = Recipe::from_yaml(SAMPLE).unwrap();
        assert!(recipe.stage(&StageId::new("clean_pages")).is_some());
        assert!(recipe.stage(&StageId::new("missing")).is_none());
    }
}

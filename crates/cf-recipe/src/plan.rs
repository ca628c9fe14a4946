//! Topological planning: turns a [`Recipe`](crate::recipe::Recipe) plus a
//! [`ModuleRegistry`] into an ordered, schema-checked
//! [`PlannedPipeline`].

use std::collections::{HashMap, HashSet, VecDeque};

use cf_utils::error::CoreError;
use cf_utils::{ModuleId, SchemaName, StageId};
use serde::Serialize;

use crate::manifest::ModuleRegistry;
use crate::recipe::Recipe;

/// One stage after planning: its position in run order, its resolved
/// output filename, and the schemas it reads/writes.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStage {
    pub ordinal: usize,
    pub stage_id: StageId,
    pub module_id: ModuleId,
    pub needs: Vec<StageId>,
    pub input_schemas: Vec<SchemaName>,
    pub output_schema: SchemaName,
    pub output_filename: String,
}

/// A fully ordered, schema-checked pipeline ready for execution.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedPipeline {
    pub recipe_name: String,
    pub stages: Vec<PlannedStage>,
}

impl PlannedPipeline {
    pub fn stage(&self, stage_id: &StageId) -> Option<&PlannedStage> {
        self.stages.iter().find(|s| &s.stage_id == stage_id)
    }
}

/// Build an execution plan: resolve modules, topologically sort stages,
/// check schema compatibility across `needs` edges, and resolve each
/// stage's output filename.
pub fn build_plan(recipe: &Recipe, registry: &ModuleRegistry) -> Result<PlannedPipeline, CoreError> {
    let order = topological_order(recipe)?;

    let mut stages = Vec::with_capacity(order.len());
    for (ordinal, stage_id) in order.into_iter().enumerate() {
        let stage = recipe
            .stage(&stage_id)
            .expect("topological_order only yields declared stage ids");
        let manifest = registry.get(&stage.module).ok_or_else(|| {
            CoreError::Configuration(format!(
                "stage '{}' references unknown module '{}'",
                stage.stage_id, stage.module
            ))
        })?;

        for dep_id in &stage.needs {
            let dep_stage = recipe
                .stage(dep_id)
                .expect("validated by Recipe::validate_shape");
            let dep_manifest = registry.get(&dep_stage.module).ok_or_else(|| {
                CoreError::Configuration(format!(
                    "stage '{}' references unknown module '{}'",
                    dep_stage.stage_id, dep_stage.module
                ))
            })?;
            if !manifest.input_schemas.is_empty()
                && !manifest.input_schemas.contains(&dep_manifest.output_schema)
            {
                return Err(CoreError::Configuration(format!(
                    "stage '{}' (module {}) cannot consume output of '{}': produces schema '{}', \
                     but '{}' only accepts {:?}",
                    stage.stage_id,
                    stage.module,
                    dep_stage.stage_id,
                    dep_manifest.output_schema,
                    stage.module,
                    manifest.input_schemas
                )));
            }
        }

        let output_filename = resolve_output_filename(recipe, stage, manifest.output_schema.as_str());

        stages.push(PlannedStage {
            ordinal,
            stage_id: stage.stage_id.clone(),
            module_id: stage.module.clone(),
            needs: stage.needs.clone(),
            input_schemas: manifest.input_schemas.clone(),
            output_schema: manifest.output_schema.clone(),
            output_filename,
        });
    }

    Ok(PlannedPipeline {
        recipe_name: recipe.name.clone(),
        stages,
    })
}

/// Output filename precedence: `stage.out` > `recipe.outputs`
/// keyed by output schema > a schema-derived default.
fn resolve_output_filename(recipe: &Recipe, stage: &crate::recipe::StageSpec, output_schema: &str) -> String {
    if let Some(out) = &stage.out {
        return out.clone();
    }
    if let Some(out) = recipe.outputs.get(&SchemaName::new(output_schema)) {
        return out.clone();
    }
    format!("{output_schema}.json")
}

/// Kahn's algorithm over the recipe's `needs` edges. Returns stage ids in
/// run order, or a `Configuration` error naming the cyclic stages.
fn topological_order(recipe: &Recipe) -> Result<Vec<StageId>, CoreError> {
    let mut in_degree: HashMap<&StageId, usize> = HashMap::new();
    let mut dependents: HashMap<&StageId, Vec<&StageId>> = HashMap::new();

    for stage in &recipe.stages {
        in_degree.entry(&stage.stage_id).or_insert(0);
        for dep in &stage.needs {
            *in_degree.entry(&stage.stage_id).or_insert(0) += 1;
            dependents.entry(dep).or_default().push(&stage.stage_id);
        }
    }

    // Seed the ready queue in declaration order so stages with no
    // dependencies keep a stable, predictable run order.
    let mut ready: VecDeque<&StageId> = recipe
        .stages
        .iter()
        .map(|s| &s.stage_id)
        .filter(|id| in_degree[id] == 0)
        .collect();

    let mut order = Vec::with_capacity(recipe.stages.len());
    let mut remaining = in_degree.clone();

    while let Some(id) = ready.pop_front() {
        order.push(id.clone());
        if let Some(next_ids) = dependents.get(id) {
            for next in next_ids {
                let degree = remaining.get_mut(next).expect("declared stage");
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(next);
                }
            }
        }
    }

    if order.len() != recipe.stages.len() {
        let unresolved: Vec<String> = recipe
            .stages
            .iter()
            .map(|s| &s.stage_id)
            .filter(|id| !order.contains(id))
            .map(ToString::to_string)
            .collect();
        return Err(CoreError::Configuration(format!(
            "recipe '{}' has a dependency cycle among stages: {}",
            recipe.name,
            unresolved.join(", ")
        )));
    }

    Ok(order)
}

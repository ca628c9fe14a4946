//! Recipe Loader & Planner.
//!
//! Parses a recipe plus an optional settings overlay, merges parameters
//! with the documented precedence (module defaults < recipe defaults <
//! stage overrides, then schema defaults), validates every resolved
//! parameter against its module's param schema, and builds a topologically
//! sorted execution plan.

pub mod manifest;
pub mod params;
pub mod plan;
pub mod recipe;
pub mod settings;

pub use manifest::{ModuleManifest, ModuleRegistry};
pub use params::{ParamConstraint, ParamSchema, ParamType, ParamValue, Params};
pub use plan::{PlannedPipeline, PlannedStage};
pub use recipe::{InstrumentationConfig, Recipe, StageSpec};
pub use settings::Settings;

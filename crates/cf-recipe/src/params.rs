//! Parameter values and the JSON-Schema-lite param schemas that constrain
//! them.

use std::collections::HashMap;

use cf_utils::error::CoreError;
use serde::{Deserialize, Serialize};

/// A resolved parameter value. Deliberately small (no arrays/objects): the
/// pipeline's params are scalar CLI-flag values, not nested configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl ParamValue {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Null => "null",
        }
    }

    /// Render as the literal text passed after a `--flag` on the module's
    /// command line.
    #[must_use]
    pub fn as_cli_arg(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null => None,
        }
    }
}

/// A named set of resolved parameters.
pub type Params = HashMap<String, ParamValue>;

/// The declared type tag for one param.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Bool,
}

/// One param's constraints, as declared in a module manifest's
/// `param_schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamConstraint {
    #[serde(rename = "type")]
    pub param_type: Option<ParamType>,
    pub r#enum: Option<Vec<String>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub pattern: Option<String>,
    pub default: Option<ParamValue>,
    #[serde(default)]
    pub required: bool,
}

/// `param name -> constraint` for one module.
pub type ParamSchema = HashMap<String, ParamConstraint>;

/// Merge three layers with the documented precedence and apply schema
/// defaults last, then validate the result against `schema`.
///
/// Precedence: module `default_params` < recipe
/// `default_params` < stage `params`. Schema defaults only fill params the
/// merge left entirely absent.
pub fn resolve_params(
    module_defaults: &Params,
    recipe_defaults: &Params,
    stage_params: &Params,
    schema: &ParamSchema,
    stage_id: &str,
    module_id: &str,
) -> Result<Params, CoreError> {
    let mut merged = module_defaults.clone();
    merged.extend(recipe_defaults.clone());
    merged.extend(stage_params.clone());

    for (name, constraint) in schema {
        if !merged.contains_key(name) {
            if let Some(default) = &constraint.default {
                merged.insert(name.clone(), default.clone());
            }
        }
    }

    for (name, constraint) in schema {
        if constraint.required && !merged.contains_key(name) {
            return Err(CoreError::ParamValidation {
                stage: stage_id.to_string(),
                module: module_id.to_string(),
                param: name.clone(),
                expected: "a value (required parameter)".to_string(),
                got: "nothing".to_string(),
            });
        }
    }

    for (name, value) in &merged {
        if let Some(constraint) = schema.get(name) {
            validate_param(stage_id, module_id, name, value, constraint)?;
        } else {
            return Err(CoreError::Configuration(format!(
                "unknown parameter '{name}' on stage '{stage_id}' (module {module_id})"
            )));
        }
    }

    Ok(merged)
}

fn validate_param(
    stage_id: &str,
    module_id: &str,
    name: &str,
    value: &ParamValue,
    constraint: &ParamConstraint,
) -> Result<(), CoreError> {
    let mismatch = |expected: &str| CoreError::ParamValidation {
        stage: stage_id.to_string(),
        module: module_id.to_string(),
        param: name.to_string(),
        expected: expected.to_string(),
        got: value.type_name().to_string(),
    };

    if let Some(expected_type) = constraint.param_type {
        let ok = matches!(
            (expected_type, value),
            (ParamType::String, ParamValue::String(_))
                | (ParamType::Number, ParamValue::Number(_))
                | (ParamType::Bool, ParamValue::Bool(_))
        );
        if !ok {
            let expected = match expected_type {
                ParamType::String => "type string",
                ParamType::Number => "type number",
                ParamType::Bool => "type bool",
            };
            return Err(mismatch(expected));
        }
    }

    if let (Some(allowed), ParamValue::String(s)) = (&constraint.r#enum, value) {
        if !allowed.iter().any(|v| v == s) {
            return Err(CoreError::ParamValidation {
                stage: stage_id.to_string(),
                module: module_id.to_string(),
                param: name.to_string(),
                expected: format!("one of {allowed:?}"),
                got: s.clone(),
            });
        }
    }

    if let ParamValue::Number(n) = value {
        if let Some(min) = constraint.minimum {
            if *n < min {
                return Err(CoreError::ParamValidation {
                    stage: stage_id.to_string(),
                    module: module_id.to_string(),
                    param: name.to_string(),
                    expected: format!(">= {min}"),
                    got: n.to_string(),
                });
            }
        }
        if let Some(max) = constraint.maximum {
            if *n > max {
                return Err(CoreError::ParamValidation {
                    stage: stage_id.to_string(),
                    module: module_id.to_string(),
                    param: name.to_string(),
                    expected: format!("<= {max}"),
                    got: n.to_string(),
                });
            }
        }
    }

    if let (Some(pattern), ParamValue::String(s)) = (&constraint.pattern, value) {
        let re = regex::Regex::new(pattern)
            .map_err(|e| CoreError::Configuration(format!("invalid pattern for '{name}': {e}")))?;
        if !re.is_match(s) {
            return Err(CoreError::ParamValidation {
                stage: stage_id.to_string(),
                module: module_id.to_string(),
                param: name.to_string(),
                expected: format!("match pattern '{pattern}'"),
                got: s.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ParamSchema {
        let mut schema = ParamSchema::new();
        schema.insert(
            "min_conf".to_string(),
            ParamConstraint {
                param_type: Some(ParamType::Number),
                minimum: Some(0.0),
                maximum: Some(1.0),
                default: Some(ParamValue::Number(0.5)),
                ..Default::default()
            },
        );
        schema
    }

    #[test]
    fn precedence_stage_overrides_recipe_overrides_module() {
        let module = Params::from([("x".to_string(), ParamValue::String("module".to_string()))]);
        let recipe = Params::from([("x".to_string(), ParamValue::String("recipe".to_string()))]);
        let stage = Params::from([("x".to_string(), ParamValue::String("stage".to_string()))]);
        let mut schema = ParamSchema::new();
        schema.insert(
            "x".to_string(),
            ParamConstraint {
                param_type: Some(ParamType::String),
                ..Default::default()
            },
        );
        let resolved = resolve_params(&module, &recipe, &stage, &schema, "s1", "m1").unwrap();
        assert_eq!(resolved["x"], ParamValue::String("stage".to_string()));
    }

    #[test]
    fn schema_default_fills_absent_param() {
        let resolved =
            resolve_params(&Params::new(), &Params::new(), &Params::new(), &schema(), "s1", "m1")
                .unwrap();
        assert_eq!(resolved["min_conf"], ParamValue::Number(0.5));
    }

    #[test]
    fn scenario_b_type_mismatch_is_fatal() {
        let stage = Params::from([("min_conf".to_string(), ParamValue::String("high".to_string()))]);
        let err = resolve_params(&Params::new(), &Params::new(), &stage, &schema(), "clean_pages", "clean_llm_v1")
            .unwrap_err();
        match err {
            CoreError::ParamValidation {
                stage,
                module,
                param,
                ..
            } => {
                assert_eq!(stage, "clean_pages");
                assert_eq!(module, "clean_llm_v1");
                assert_eq!(param, "min_conf");
            }
            other => panic!("expected ParamValidation, got {other:?}"),
        }
    }

    #[test]
    fn unknown_parameter_is_fatal() {
        let stage = Params::from([("bogus".to_string(), ParamValue::Bool(true))]);
        let err = resolve_params(&Params::new(), &Params::new(), &stage, &schema(), "s1", "m1")
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn required_parameter_missing_is_fatal() {
        let mut schema = ParamSchema::new();
        schema.insert(
            "model".to_string(),
            ParamConstraint {
                param_type: Some(ParamType::String),
                required: true,
                ..Default::default()
            },
        );
        let err = resolve_params(&Params::new(), &Params::new(), &Params::new(), &schema, "s1", "m1")
            .unwrap_err();
        assert!(matches!(err, CoreError::ParamValidation { .. }));
    }

    #[test]
    fn range_violation_is_fatal() {
        let stage = Params::from([("min_conf".to_string(), ParamValue::Number(1.5))]);
        let err = resolve_params(&Params::new(), &Params::new(), &stage, &schema(), "s1", "m1")
            .unwrap_err();
        assert!(matches!(err, CoreError::ParamValidation { .. }));
    }
}

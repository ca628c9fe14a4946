//! Per-record and cross-record artifact validation.

use cf_utils::SchemaName;
use serde_json::Value;

use crate::field::FieldSpec;
use crate::registry::SchemaRegistry;

/// One validation failure: which record, which field, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub record_index: Option<usize>,
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    fn record(index: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            record_index: Some(index),
            field: Some(field.into()),
            message: message.into(),
        }
    }

    fn cross_record(message: impl Into<String>) -> Self {
        Self {
            record_index: None,
            field: None,
            message: message.into(),
        }
    }
}

/// Result of validating one artifact.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a parsed set of records against `schema`: required fields
/// present, types correct, enum memberships honored, then the schema's
/// cross-record invariant (if any) over the full record set.
pub fn validate_records(
    registry: &SchemaRegistry,
    schema: &SchemaName,
    records: &[Value],
) -> Result<ValidationOutcome, String> {
    let spec = registry
        .get(schema)
        .ok_or_else(|| format!("schema-not-found: {schema}"))?;

    let mut outcome = ValidationOutcome::default();
    for (index, record) in records.iter().enumerate() {
        validate_one_record(spec, index, record, &mut outcome.errors);
    }

    if outcome.is_ok() {
        if let Some(check) = spec.cross_record {
            if let Err(message) = check(records) {
                outcome.errors.push(ValidationError::cross_record(message));
            }
        }
    }

    Ok(outcome)
}

fn validate_one_record(
    spec: &FieldSpec,
    index: usize,
    record: &Value,
    errors: &mut Vec<ValidationError>,
) {
    let Some(object) = record.as_object() else {
        errors.push(ValidationError::record(
            index,
            "<record>",
            "record is not a JSON object",
        ));
        return;
    };

    for decl in &spec.required {
        match object.get(&decl.name) {
            None => errors.push(ValidationError::record(
                index,
                &decl.name,
                format!("missing required field '{}'", decl.name),
            )),
            Some(value) => check_field(decl, index, value, errors),
        }
    }

    for decl in &spec.optional {
        if let Some(value) = object.get(&decl.name) {
            check_field(decl, index, value, errors);
        }
    }
}

fn check_field(
    decl: &crate::field::FieldDecl,
    index: usize,
    value: &Value,
    errors: &mut Vec<ValidationError>,
) {
    if !decl.kind.matches(value) {
        errors.push(ValidationError::record(
            index,
            &decl.name,
            format!(
                "expected type {}, got {}",
                decl.kind.describe(),
                describe_value_kind(value)
            ),
        ));
        return;
    }
    if let Some(allowed) = &decl.enum_values {
        if let Some(s) = value.as_str() {
            if !allowed.iter().any(|v| v == s) {
                errors.push(ValidationError::record(
                    index,
                    &decl.name,
                    format!("value '{s}' is not one of {allowed:?}"),
                ));
            }
        }
    }
}

fn describe_value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDecl, FieldKind};
    use serde_json::json;

    fn registry_with(spec: FieldSpec) -> (SchemaRegistry, SchemaName) {
        let mut registry = SchemaRegistry::new();
        let name = SchemaName::new("test.v1");
        registry.register(name.clone(), spec);
        (registry, name)
    }

    #[test]
    fn missing_required_field_is_reported() {
        let spec = FieldSpec::new(vec![FieldDecl::new("id", FieldKind::String)], vec![]);
        let (registry, name) = registry_with(spec);
        let records = vec![json!({})];
        let outcome = validate_records(&registry, &name, &records).unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("missing required"));
    }

    #[test]
    fn wrong_type_is_reported() {
        let spec = FieldSpec::new(vec![FieldDecl::new("page", FieldKind::Integer)], vec![]);
        let (registry, name) = registry_with(spec);
        let records = vec![json!({"page": "three"})];
        let outcome = validate_records(&registry, &name, &records).unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("expected type integer"));
    }

    #[test]
    fn enum_violation_is_reported() {
        let spec = FieldSpec::new(
            vec![FieldDecl::new("status", FieldKind::String).with_enum(["found", "unresolved"])],
            vec![],
        );
        let (registry, name) = registry_with(spec);
        let records = vec![json!({"status": "maybe"})];
        let outcome = validate_records(&registry, &name, &records).unwrap();
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn cross_record_check_runs_after_per_record_checks_pass() {
        fn unique_ids(records: &[Value]) -> Result<(), String> {
            let mut seen = std::collections::HashSet::new();
            for r in records {
                let id = r["id"].as_str().unwrap_or_default();
                if !seen.insert(id) {
                    return Err(format!("duplicate id: {id}"));
                }
            }
            Ok(())
        }

        let spec = FieldSpec::new(vec![FieldDecl::new("id", FieldKind::String)], vec![])
            .with_cross_record(unique_ids);
        let (registry, name) = registry_with(spec);
        let records = vec![json!({"id": "a"}), json!({"id": "a"})];
        let outcome = validate_records(&registry, &name, &records).unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("duplicate id"));
    }

    #[test]
    fn schema_not_found_is_an_error() {
        let registry = SchemaRegistry::new();
        let result = validate_records(&registry, &SchemaName::new("missing"), &[]);
        assert!(result.is_err());
    }
}

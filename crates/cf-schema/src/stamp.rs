//! Record stamping: fill mandatory metadata, then drop undeclared fields.

use cf_utils::time::format_micros;
use cf_utils::{ModuleId, RunId, SchemaName};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::field::FieldSpec;
use crate::registry::SchemaRegistry;

/// The four fields every stamped record carries, regardless of schema.
pub const META_FIELDS: [&str; 4] = ["schema_version", "module_id", "run_id", "created_at"];

/// Stamp one record: fill `schema_version`/`module_id`/`run_id`/`created_at`
/// when absent (never overwrite an existing value - a module that already
/// set one of these, e.g. during a resumed run replay, is left alone), then
/// project the record onto the schema's declared field set plus the meta
/// fields. Fields not declared by `spec` are dropped.
pub fn stamp_record(
    spec: &FieldSpec,
    schema: &SchemaName,
    module_id: &ModuleId,
    run_id: &RunId,
    created_at: DateTime<Utc>,
    mut record: Map<String, Value>,
) -> Map<String, Value> {
    record
        .entry("schema_version")
        .or_insert_with(|| Value::String(schema.as_str().to_string()));
    record
        .entry("module_id")
        .or_insert_with(|| Value::String(module_id.as_str().to_string()));
    record
        .entry("run_id")
        .or_insert_with(|| Value::String(run_id.as_str().to_string()));
    record
        .entry("created_at")
        .or_insert_with(|| Value::String(format_micros(created_at)));

    let allowed: std::collections::HashSet<&str> = spec
        .declared_names()
        .into_iter()
        .chain(META_FIELDS)
        .collect();

    record.retain(|key, _| allowed.contains(key.as_str()));
    record
}

/// Stamp every record in a JSONL document's parsed line set.
pub fn stamp_records(
    registry: &SchemaRegistry,
    schema: &SchemaName,
    module_id: &ModuleId,
    run_id: &RunId,
    created_at: DateTime<Utc>,
    records: Vec<Map<String, Value>>,
) -> Result<Vec<Map<String, Value>>, String> {
    let spec = registry
        .get(schema)
        .ok_or_else(|| format!("schema-not-found: {schema}"))?;
    Ok(records
        .into_iter()
        .map(|r| stamp_record(spec, schema, module_id, run_id, created_at, r))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDecl, FieldKind};
    use serde_json::json;

    fn sample_spec() -> FieldSpec {
        FieldSpec::new(
            vec![FieldDecl::new("page", FieldKind::Integer)],
            vec![FieldDecl::new("confidence", FieldKind::Number)],
        )
    }

    #[test]
    fn stamps_missing_meta_fields() {
        let spec = sample_spec();
        let schema = SchemaName::new("page_text.v1");
        let module = ModuleId::new("ocr_v1");
        let run = RunId::new("run-1");
        let now = Utc::now();

        let mut record = Map::new();
        record.insert("page".to_string(), json!(3));

        let stamped = stamp_record(&spec, &schema, &module, &run, now, record);
        assert_eq!(stamped["schema_version"], json!("page_text.v1"));
        assert_eq!(stamped["module_id"], json!("ocr_v1"));
        assert_eq!(stamped["run_id"], json!("run-1"));
        assert!(stamped.contains_key("created_at"));
    }

    #[test]
    fn drops_undeclared_fields() {
        let spec = sample_spec();
        let schema = SchemaName::new("page_text.v1");
        let module = ModuleId::new("ocr_v1");
        let run = RunId::new("run-1");
        let now = Utc::now();

        let mut record = Map::new();
        record.insert("page".to_string(), json!(1));
        record.insert("confidence_v2".to_string(), json!(0.9)); // not declared

        let stamped = stamp_record(&spec, &schema, &module, &run, now, record);
        assert!(!stamped.contains_key("confidence_v2"));
        assert!(stamped.contains_key("page"));
    }

    #[test]
    fn does_not_overwrite_existing_meta_fields() {
        let spec = sample_spec();
        let schema = SchemaName::new("page_text.v1");
        let module = ModuleId::new("ocr_v1");
        let run = RunId::new("run-1");
        let now = Utc::now();

        let mut record = Map::new();
        record.insert("page".to_string(), json!(1));
        record.insert("run_id".to_string(), json!("earlier-run"));

        let stamped = stamp_record(&spec, &schema, &module, &run, now, record);
        assert_eq!(stamped["run_id"], json!("earlier-run"));
    }

    proptest::proptest! {
        /// No matter what stray fields a module stuffs into a record, a
        /// stamped record only ever carries declared fields plus the four
        /// meta fields - the "schemas are truth" contract holds for any
        /// input, not just the handful of cases above.
        #[test]
        fn stamped_records_never_carry_undeclared_fields(
            extra_keys in proptest::collection::vec("[a-z_]{1,12}", 0..8),
            extra_values in proptest::collection::vec(proptest::num::i64::ANY, 0..8),
        ) {
            let spec = sample_spec();
            let schema = SchemaName::new("page_text.v1");
            let module = ModuleId::new("ocr_v1");
            let run = RunId::new("run-1");
            let now = Utc::now();

            let mut record = Map::new();
            record.insert("page".to_string(), json!(1));
            for (key, value) in extra_keys.iter().zip(extra_values.iter()) {
                if !META_FIELDS.contains(&key.as_str()) && key != "page" {
                    record.insert(key.clone(), json!(value));
                }
            }

            let stamped = stamp_record(&spec, &schema, &module, &run, now, record);
            let allowed: std::collections::HashSet<&str> =
                spec.declared_names().into_iter().chain(META_FIELDS).collect();
            for key in stamped.keys() {
                proptest::prop_assert!(allowed.contains(key.as_str()), "unexpected field: {key}");
            }
        }

        /// Stamping is a fixed point once the meta fields are already
        /// present: re-stamping an already-stamped record never changes it.
        #[test]
        fn restamping_an_already_stamped_record_is_a_no_op(page in proptest::num::i64::ANY) {
            let spec = sample_spec();
            let schema = SchemaName::new("page_text.v1");
            let module = ModuleId::new("ocr_v1");
            let run = RunId::new("run-1");
            let now = Utc::now();

            let mut record = Map::new();
            record.insert("page".to_string(), json!(page));
            let once = stamp_record(&spec, &schema, &module, &run, now, record);
            let twice = stamp_record(&spec, &schema, &module, &run, now, once.clone());
            proptest::prop_assert_eq!(once, twice);
        }
    }
}

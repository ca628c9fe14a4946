//! Built-in schemas for the gamebook pipeline's JSONL artifacts.
//!
//! These are reference schemas good enough to drive the sample recipe
//! shipped with this workspace's `cf-cli` fixtures and the end-to-end
//! tests. A real deployment would extend this table as new modules are
//! written - the registry is authoritative, so extending it is the only
//! sanctioned way to let a module emit a new field.

use serde_json::Value;

use cf_utils::SchemaName;

use crate::field::{FieldDecl, FieldKind, FieldSpec};
use crate::registry::SchemaRegistry;

/// Register every built-in schema into `registry`.
pub fn register_builtin_schemas(registry: &mut SchemaRegistry) {
    registry.register(SchemaName::new("page_text.v1"), page_text_schema());
    registry.register(
        SchemaName::new("section_boundary.v1"),
        section_boundary_schema(),
    );
    registry.register(SchemaName::new("choice_record.v1"), choice_record_schema());
    registry.register(
        SchemaName::new("escalation_resolution.v1"),
        escalation_resolution_schema(),
    );
    registry.register(SchemaName::new("gamebook.v1"), gamebook_schema());
}

fn page_text_schema() -> FieldSpec {
    FieldSpec::new(
        vec![
            FieldDecl::new("page", FieldKind::Integer),
            FieldDecl::new("text", FieldKind::String),
        ],
        vec![FieldDecl::new("confidence", FieldKind::Number)],
    )
    .with_cross_record(monotonic_pages)
}

fn monotonic_pages(records: &[Value]) -> Result<(), String> {
    let mut last: Option<i64> = None;
    for record in records {
        let page = record["page"].as_i64().unwrap_or_default();
        if let Some(prev) = last {
            if page <= prev {
                return Err(format!(
                    "page numbers must be strictly increasing: {prev} followed by {page}"
                ));
            }
        }
        last = Some(page);
    }
    Ok(())
}

fn section_boundary_schema() -> FieldSpec {
    FieldSpec::new(
        vec![
            FieldDecl::new("section_id", FieldKind::Integer),
            FieldDecl::new("start_page", FieldKind::Integer),
        ],
        vec![
            FieldDecl::new("end_page", FieldKind::Integer),
            FieldDecl::new("confidence", FieldKind::Number),
        ],
    )
    .with_cross_record(unique_section_ids)
}

fn unique_section_ids(records: &[Value]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for record in records {
        let id = record["section_id"].as_i64().unwrap_or_default();
        if !seen.insert(id) {
            return Err(format!("duplicate section_id: {id}"));
        }
    }
    Ok(())
}

fn choice_record_schema() -> FieldSpec {
    FieldSpec::new(
        vec![
            FieldDecl::new("section_id", FieldKind::Integer),
            FieldDecl::new("target_section", FieldKind::Integer),
            FieldDecl::new("text", FieldKind::String),
        ],
        vec![FieldDecl::new("condition", FieldKind::String)],
    )
}

fn escalation_resolution_schema() -> FieldSpec {
    FieldSpec::new(
        vec![
            FieldDecl::new("item_id", FieldKind::String),
            FieldDecl::new("status", FieldKind::String)
                .with_enum(["found", "resolved-not-found", "unresolved"]),
        ],
        vec![
            FieldDecl::new("reason", FieldKind::String),
            FieldDecl::new("trace", FieldKind::Array),
        ],
    )
}

/// The assembled terminal document: a single record per
/// artifact, so the cross-record check above doesn't apply here. Stamping
/// adds the four meta fields alongside `start_section`/`sections` rather
/// than nesting them, which `cf_validate::document::GamebookDocument`
/// tolerates since it ignores unknown fields on deserialization.
fn gamebook_schema() -> FieldSpec {
    FieldSpec::new(
        vec![
            FieldDecl::new("start_section", FieldKind::String),
            FieldDecl::new("sections", FieldKind::Object),
        ],
        vec![FieldDecl::new("metadata", FieldKind::Object)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_builtin_schemas() {
        let mut registry = SchemaRegistry::new();
        register_builtin_schemas(&mut registry);
        assert!(registry.contains(&SchemaName::new("page_text.v1")));
        assert!(registry.contains(&SchemaName::new("section_boundary.v1")));
        assert!(registry.contains(&SchemaName::new("choice_record.v1")));
        assert!(registry.contains(&SchemaName::new("escalation_resolution.v1")));
        assert!(registry.contains(&SchemaName::new("gamebook.v1")));
    }
}

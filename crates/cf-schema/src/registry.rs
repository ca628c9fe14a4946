//! The schema registry: an explicit, in-process table rather than a
//! dynamically-discovered plugin directory.

use std::collections::HashMap;

use cf_utils::SchemaName;

use crate::field::FieldSpec;

/// Maps schema names to their field specifications. Construct with
/// [`SchemaRegistry::new`] and populate via [`SchemaRegistry::register`],
/// typically from [`crate::builtin::register_builtin_schemas`].
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<SchemaName, FieldSpec>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema. Re-registering an existing name overwrites it -
    /// callers that need "schema not found" to be a hard implementer error
    /// should only call this from a single startup path.
    pub fn register(&mut self, name: SchemaName, spec: FieldSpec) {
        self.schemas.insert(name, spec);
    }

    #[must_use]
    pub fn get(&self, name: &SchemaName) -> Option<&FieldSpec> {
        self.schemas.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &SchemaName) -> bool {
        self.schemas.contains_key(name)
    }

    /// All registered schema names, for diagnostics (`--dump-plan`, doctor
    /// checks).
    pub fn names(&self) -> impl Iterator<Item = &SchemaName> {
        self.schemas.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDecl, FieldKind};

    #[test]
    fn register_and_get_round_trip() {
        let mut registry = SchemaRegistry::new();
        let name = SchemaName::new("page_text.v1");
        registry.register(
            name.clone(),
            FieldSpec::new(vec![FieldDecl::new("page", FieldKind::Integer)], vec![]),
        );
        assert!(registry.contains(&name));
        assert!(registry.get(&name).is_some());
        assert!(registry.get(&SchemaName::new("missing")).is_none());
    }
}

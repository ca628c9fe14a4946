//! Newtype identifiers.
//!
//! Stage ids, module ids, schema names, and run ids are all plain strings
//! on the wire, but they are never interchangeable in code: a function that
//! takes a `ModuleId` should not silently accept a `StageId`. Wrapping each
//! in its own type catches that class of mistake at compile time, the way
//! `PhaseId` does for phase names in the orchestration lineage this crate
//! descends from.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Construct from any string-like value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the owned string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(RunId, "Unique identifier for one pipeline execution.");
string_id!(StageId, "Unique identifier for a DAG node within a recipe.");
string_id!(ModuleId, "Identifier pointing at a module manifest.");
string_id!(
    SchemaName,
    "Name of a registered schema; doubles as the `schema_version` stamp."
);

impl RunId {
    /// Generate a fresh, time-sortable run id: `YYYYMMDDTHHMMSSZ-<short-uuid>`.
    ///
    /// The timestamp prefix keeps run directories sorted chronologically on
    /// disk without requiring a directory listing sort by mtime; the uuid
    /// suffix guarantees uniqueness for runs started within the same second.
    #[must_use]
    pub fn generate() -> Self {
        let now = crate::time::now_utc();
        let stamp = now.format("%Y%m%dT%H%M%SZ");
        let suffix = uuid::Uuid::new_v4();
        let short = suffix.simple().to_string();
        Self(format!("{stamp}-{}", &short[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_generate_has_timestamp_prefix_and_is_unique() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().contains('-'));
    }

    #[test]
    fn stage_id_round_trips_through_serde() {
        let id = StageId::new("detect_boundaries");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"detect_boundaries\"");
        let back: StageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ids_are_not_interchangeable_types() {
        let stage = StageId::new("a");
        let module = ModuleId::new("a");
        // Same string payload, different types - this is the point.
        assert_eq!(stage.as_str(), module.as_str());
    }
}

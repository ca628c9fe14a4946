//! Field declarations that make up a schema's `FieldSpec`.

use serde_json::Value;

/// JSON type tag a declared field must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Bool,
    Array,
    Object,
    /// Accepts any JSON value; used for passthrough/opaque fields such as
    /// `extra`.
    Any,
}

impl FieldKind {
    /// Whether `value` satisfies this field's type constraint.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            Self::Bool => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    /// Human-readable name used in validation error messages.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Bool => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

/// A single declared field: its name, type, and (optionally) the closed
/// set of string values it may take.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub kind: FieldKind,
    pub enum_values: Option<Vec<String>>,
}

impl FieldDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enum_values: None,
        }
    }

    #[must_use]
    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// A cross-record invariant check run once per artifact, after every record
/// has individually passed per-record validation. Examples:
/// "ids are unique", "page numbers are monotonic".
pub type CrossRecordCheck = fn(&[Value]) -> Result<(), String>;

/// The declarative shape of one schema: required fields, optional fields,
/// and an optional cross-record invariant.
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    pub required: Vec<FieldDecl>,
    pub optional: Vec<FieldDecl>,
    pub cross_record: Option<CrossRecordCheck>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(required: Vec<FieldDecl>, optional: Vec<FieldDecl>) -> Self {
        Self {
            required,
            optional,
            cross_record: None,
        }
    }

    #[must_use]
    pub fn with_cross_record(mut self, check: CrossRecordCheck) -> Self {
        self.cross_record = Some(check);
        self
    }

    /// The full set of field names this schema declares, excluding the four
    /// stamped metadata fields (those are always allowed, independent of
    /// this set - see `stamp.rs`).
    #[must_use]
    pub fn declared_names(&self) -> Vec<&str> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .map(|f| f.name.as_str())
            .collect()
    }
}

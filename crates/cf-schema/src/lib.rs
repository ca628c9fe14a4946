//! Schema Registry & Validator.
//!
//! The registry is the single source of truth for what fields may appear
//! in an artifact. Stamping fills the four mandatory metadata fields and
//! then projects each record down to its declared field set, dropping
//! anything else - a deliberate design decision: if a
//! module starts emitting a new field, the schema must be extended or the
//! field is silently lost. This crate never backfills or widens a schema
//! on its own.

pub mod builtin;
pub mod field;
pub mod registry;
pub mod stamp;
pub mod validate;

pub use field::{CrossRecordCheck, FieldDecl, FieldKind, FieldSpec};
pub use registry::SchemaRegistry;
pub use validate::{ValidationError, ValidationOutcome};

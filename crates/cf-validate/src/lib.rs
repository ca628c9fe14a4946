//! Final Validation Gate.
//!
//! Certifies that the terminal structured JSON document is game-ready:
//! schema conformance, section-id integrity, sequence-target integrity,
//! and reachability from the start section.

pub mod document;
pub mod gate;
pub mod report;

pub use document::{GamebookDocument, GamebookMetadata, Section, SequenceEvent};
pub use gate::{validate, CURRENT_VALIDATOR_VERSION};
pub use report::{ReportError, ReportWarning, Summary, ValidationReport};

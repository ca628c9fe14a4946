//! Escalation-Loop Contract.
//!
//! Every content module that must find a bounded set of items (sections,
//! choices, stat checks...) in noisy input implements the same shape: try
//! at the current model tier, validate, and if validation fails escalate
//! to a stronger tier up to a retry cap. This crate is the shared driver
//! for that loop plus the per-item resolution record it must emit.

pub mod policy;
pub mod record;
pub mod run_loop;

pub use policy::EscalationPolicy;
pub use record::{EscalationOutcome, EscalationRecord, Resolution};
pub use run_loop::run_escalation_loop;

//! Escalation knobs a recipe or module manifest can set.

use serde::{Deserialize, Serialize};

/// Caps and overrides for one escalation-capable stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// How many escalation passes beyond the first attempt are allowed.
    pub max_retries: u32,
    /// If true, residual `Unresolved` items do not fail the stage; they
    /// are recorded as stubs instead.
    #[serde(default)]
    pub allow_stubs: bool,
}

impl EscalationPolicy {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            allow_stubs: false,
        }
    }

    #[must_use]
    pub fn allowing_stubs(mut self) -> Self {
        self.allow_stubs = true;
        self
    }
}

//! Per-item resolution records and the run-level outcome they roll up
//! into.

use serde::{Deserialize, Serialize};

/// How one escalated item ended up, after however many retry passes it
/// took.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "status")]
pub enum Resolution<T> {
    Found(T),
    ResolvedNotFound {
        reason: String,
        upstream_trace: Vec<String>,
    },
    Unresolved,
}

impl<T> Resolution<T> {
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}

/// One item's full resolution record, including how many attempts it
/// took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRecord<T> {
    pub item_id: String,
    pub resolution: Resolution<T>,
    pub attempts: u32,
}

/// The result of running the escalation loop over a whole batch of
/// items.
#[derive(Debug, Clone)]
pub struct EscalationOutcome<T> {
    pub records: Vec<EscalationRecord<T>>,
    pub unresolved_count: usize,
    /// Whether the owning stage must be marked `failed`.
    pub stage_failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_is_unresolved_detects_variant() {
        let unresolved: Resolution<u32> = Resolution::Unresolved;
        let found: Resolution<u32> = Resolution::Found(1);
        assert!(unresolved.is_unresolved());
        assert!(!found.is_unresolved());
    }

    #[test]
    fn resolution_serializes_with_tagged_status() {
        let resolved: Resolution<u32> = Resolution::ResolvedNotFound {
            reason: "page torn".to_string(),
            upstream_trace: vec!["ocr_v1".to_string()],
        };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["status"], "resolved-not-found");
        assert_eq!(json["reason"], "page torn");
    }
}

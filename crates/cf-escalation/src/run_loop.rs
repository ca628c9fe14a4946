//! The generic escalation-loop driver itself.

use crate::policy::EscalationPolicy;
use crate::record::{EscalationOutcome, EscalationRecord, Resolution};

/// Drive one escalation-capable stage's batch of items through however
/// many attempts `policy.max_retries` allows.
///
/// `attempt` is called once per item per pass, with the zero-based pass
/// number, and returns that pass's [`Resolution`]. The loop stops
/// escalating an item as soon as it stops being `Unresolved`; items still
/// `Unresolved` after the final pass count toward the cap.
pub fn run_escalation_loop<Item, Id, T, F>(
    items: &[Item],
    item_id: impl Fn(&Item) -> Id,
    policy: &EscalationPolicy,
    mut attempt: F,
) -> EscalationOutcome<T>
where
    Id: Into<String>,
    F: FnMut(&Item, u32) -> Resolution<T>,
{
    let mut records = Vec::with_capacity(items.len());
    let mut unresolved_count = 0;

    for item in items {
        let mut resolution = Resolution::Unresolved;
        let mut attempts_used = 0;
        for pass in 0..=policy.max_retries {
            resolution = attempt(item, pass);
            attempts_used = pass + 1;
            if !resolution.is_unresolved() {
                break;
            }
        }
        if resolution.is_unresolved() {
            unresolved_count += 1;
            tracing::warn!(
                item_id = %item_id(item).into(),
                attempts = attempts_used,
                "item unresolved after escalation cap"
            );
        }
        records.push(EscalationRecord {
            item_id: item_id(item).into(),
            resolution,
            attempts: attempts_used,
        });
    }

    let stage_failed = unresolved_count > 0 && !policy.allow_stubs;

    EscalationOutcome {
        records,
        unresolved_count,
        stage_failed,
    }
}

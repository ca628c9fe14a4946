//! The checks themselves: schema conformance, section integrity, and
//! reachability.

use std::collections::{HashSet, VecDeque};

use serde_json::Value;

use crate::document::GamebookDocument;
use crate::report::{ReportError, ReportWarning, Summary, ValidationReport};

/// The validator version this gate implements. Compared against
/// `metadata.validator_version` to warn on drift.
pub const CURRENT_VALIDATOR_VERSION: &str = "1.0.0";

/// Run every validation check against a raw JSON document.
///
/// The raw [`Value`] is kept alongside the typed [`GamebookDocument`]
/// because one check — duplicate section ids — needs to see the document
/// before a `HashMap` has already deduplicated same-key entries.
pub fn validate(raw: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let doc: GamebookDocument = match serde_json::from_value(raw.clone()) {
        Ok(doc) => doc,
        Err(e) => {
            errors.push(ReportError::new("$", format!("schema conformance failed: {e}")));
            return ValidationReport {
                valid: false,
                errors,
                warnings,
                summary: Summary::default(),
            };
        }
    };

    check_duplicate_ids(raw, &mut errors);
    check_id_matches_key(&doc, &mut errors);
    check_start_section_exists(&doc, &mut errors);
    check_targets_exist(&doc, &mut errors);
    check_missing_ids_in_range(&doc, &mut errors);
    check_validator_version(&doc, &mut warnings);

    let summary = check_reachability(&doc, &mut warnings);

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        summary,
    }
}

fn check_id_matches_key(doc: &GamebookDocument, errors: &mut Vec<ReportError>) {
    for (key, section) in &doc.sections {
        if &section.id != key {
            errors.push(
                ReportError::new(
                    format!("$.sections.{key}.id"),
                    "section id does not match its map key",
                )
                .with_expected_received(key.clone(), section.id.clone()),
            );
        }
    }
}

/// Detects same-`id` collisions across *different* map keys. This can
/// only happen if the raw document was produced with `sections` as an
/// array rather than an object, since an object's keys are already
/// unique by construction.
fn check_duplicate_ids(raw: &Value, errors: &mut Vec<ReportError>) {
    let Some(Value::Array(entries)) = raw.get("sections") else {
        return;
    };
    let mut seen = HashSet::new();
    for entry in entries {
        if let Some(id) = entry.get("id").and_then(Value::as_str) {
            if !seen.insert(id.to_string()) {
                errors.push(ReportError::new(
                    "$.sections",
                    format!("duplicate section id '{id}'"),
                ));
            }
        }
    }
}

fn check_start_section_exists(doc: &GamebookDocument, errors: &mut Vec<ReportError>) {
    if !doc.sections.contains_key(&doc.start_section) {
        errors.push(ReportError::new(
            "$.start_section",
            format!("startSection '{}' does not exist in sections", doc.start_section),
        ));
    }
}

fn check_targets_exist(doc: &GamebookDocument, errors: &mut Vec<ReportError>) {
    for (key, section) in &doc.sections {
        for (i, event) in section.sequence.iter().enumerate() {
            for target in event.targets() {
                if !doc.sections.contains_key(target) {
                    errors.push(ReportError::new(
                        format!("$.sections.{key}.sequence[{i}]"),
                        format!("targetSection '{target}' does not exist"),
                    ));
                }
            }
        }
    }
}

fn check_missing_ids_in_range(doc: &GamebookDocument, errors: &mut Vec<ReportError>) {
    let (lo, hi) = doc.metadata.expected_range();
    let present: HashSet<u32> = doc.sections.keys().filter_map(|k| k.parse().ok()).collect();
    let mut missing: Vec<u32> = (lo..=hi).filter(|n| !present.contains(n)).collect();
    missing.sort_unstable();
    if !missing.is_empty() {
        let list = missing.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        errors.push(ReportError::new(
            "$.sections",
            format!("Missing {} sections in range {lo}-{hi}: {list}", missing.len()),
        ));
    }
}

fn check_validator_version(doc: &GamebookDocument, warnings: &mut Vec<ReportWarning>) {
    if let Some(version) = &doc.metadata.validator_version {
        if version != CURRENT_VALIDATOR_VERSION {
            warnings.push(ReportWarning::new(
                "$.metadata.validator_version",
                format!(
                    "gamebook was produced for validator '{version}', running validator is '{CURRENT_VALIDATOR_VERSION}'"
                ),
            ));
        }
    }
}

/// BFS from `start_section` over the typed navigation graph. Unreachable
/// gameplay sections are warnings, not errors; the first
/// warning names the entry points of the unreachable subgraph: unreachable
/// sections that no other unreachable section points to.
fn check_reachability(doc: &GamebookDocument, warnings: &mut Vec<ReportWarning>) -> Summary {
    let total_sections = doc.sections.len();

    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();
    if doc.sections.contains_key(&doc.start_section) {
        reachable.insert(doc.start_section.clone());
        queue.push_back(doc.start_section.clone());
    }
    while let Some(current) = queue.pop_front() {
        let Some(section) = doc.sections.get(&current) else {
            continue;
        };
        for event in &section.sequence {
            for target in event.targets() {
                if reachable.insert(target.to_string()) {
                    queue.push_back(target.to_string());
                }
            }
        }
    }

    let unreachable: HashSet<&String> = doc
        .sections
        .keys()
        .filter(|id| !reachable.contains(*id))
        .collect();

    let mut referenced_by_unreachable: HashSet<&str> = HashSet::new();
    for id in &unreachable {
        if let Some(section) = doc.sections.get(*id) {
            for event in &section.sequence {
                referenced_by_unreachable.extend(event.targets());
            }
        }
    }

    let mut entry_points: Vec<String> = unreachable
        .iter()
        .filter(|id| !referenced_by_unreachable.contains(id.as_str()))
        .map(|id| (*id).clone())
        .collect();
    entry_points.sort();

    let mut sorted_unreachable: Vec<&String> = unreachable.iter().copied().collect();
    sorted_unreachable.sort();
    for id in &sorted_unreachable {
        warnings.push(ReportWarning::new(
            format!("$.sections.{id}"),
            format!(
                "Gameplay section \"{id}\" is unreachable from startSection \"{}\"",
                doc.start_section
            ),
        ));
    }

    Summary {
        total_sections,
        reachable: reachable.len(),
        unreachable: unreachable.len(),
        entry_points,
    }
}

//! The terminal gamebook document and its typed navigation graph
//!.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One gameplay section, keyed in [`GamebookDocument::sections`] by its
/// own `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub sequence: Vec<SequenceEvent>,
}

/// A navigation edge or terminal outcome in a section's sequence.
/// Terminal outcomes (death/victory/defeat/end) carry no target and end
/// the playthrough along that branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequenceEvent {
    Choice {
        target_section: String,
    },
    StatCheck {
        pass_target: String,
        fail_target: String,
    },
    TestLuck {
        lucky_target: String,
        unlucky_target: String,
    },
    ItemCheck {
        has_target: String,
        missing_target: String,
    },
    Combat {
        win_target: String,
        lose_target: String,
        escape_target: Option<String>,
    },
    Conditional {
        then_target: String,
        else_target: String,
    },
    Death,
    Victory,
    Defeat,
    End,
}

impl SequenceEvent {
    /// Every section id this event can transition to.
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Choice { target_section } => vec![target_section.as_str()],
            Self::StatCheck {
                pass_target,
                fail_target,
            } => vec![pass_target.as_str(), fail_target.as_str()],
            Self::TestLuck {
                lucky_target,
                unlucky_target,
            } => vec![lucky_target.as_str(), unlucky_target.as_str()],
            Self::ItemCheck {
                has_target,
                missing_target,
            } => vec![has_target.as_str(), missing_target.as_str()],
            Self::Combat {
                win_target,
                lose_target,
                escape_target,
            } => {
                let mut targets = vec![win_target.as_str(), lose_target.as_str()];
                if let Some(escape) = escape_target {
                    targets.push(escape.as_str());
                }
                targets
            }
            Self::Conditional {
                then_target,
                else_target,
            } => vec![then_target.as_str(), else_target.as_str()],
            Self::Death | Self::Victory | Self::Defeat | Self::End => Vec::new(),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Death | Self::Victory | Self::Defeat | Self::End)
    }
}

/// Metadata describing the expected numeric section id range. Defaults to
/// `1..=400` when the document carries none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GamebookMetadata {
    pub section_range: Option<(u32, u32)>,
    pub validator_version: Option<String>,
}

impl GamebookMetadata {
    #[must_use]
    pub fn expected_range(&self) -> (u32, u32) {
        self.section_range.unwrap_or((1, 400))
    }
}

/// The full terminal gamebook artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamebookDocument {
    pub start_section: String,
    pub sections: HashMap<String, Section>,
    #[serde(default)]
    pub metadata: GamebookMetadata,
}

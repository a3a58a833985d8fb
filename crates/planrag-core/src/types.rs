//! Domain types shared by the retrieval crates.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type DocumentId = String;
pub type Vector = Vec<f32>;

/// The part of a plan a passage was extracted from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    Outcome,
    EnvironmentalAssessment,
    EngagementStrategy,
    Site,
    Policy,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Outcome => "outcome",
            SourceTag::EnvironmentalAssessment => "environmental-assessment",
            SourceTag::EngagementStrategy => "engagement-strategy",
            SourceTag::Site => "site",
            SourceTag::Policy => "policy",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of retrieval: one short human-readable sentence and its origin.
///
/// `text` is never empty; the chunk builder skips blank fields instead of
/// emitting placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Passage {
    pub text: String,
    pub source_tag: SourceTag,
}

impl Passage {
    pub fn new(text: impl Into<String>, source_tag: SourceTag) -> Self {
        Self { text: text.into(), source_tag }
    }
}

//! Read-only projections of the planning record consumed by the chunk builder.
//!
//! Every optional field is explicit. Absent strings, blank strings and empty
//! lists are all treated as "not filled in".

use serde::{Deserialize, Serialize};

pub const PLAN_SNAPSHOT_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    PLAN_SNAPSHOT_SCHEMA_VERSION
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub id: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
    #[serde(default)]
    pub environmental_assessment: Option<EnvironmentalAssessment>,
    #[serde(default)]
    pub engagement_strategy: Option<EngagementStrategy>,
    #[serde(default)]
    pub sites: Vec<Site>,
}

impl PlanSnapshot {
    pub fn new(id: impl Into<String>) -> Self {
        Self { schema_version: PLAN_SNAPSHOT_SCHEMA_VERSION, id: id.into(), ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentalAssessment {
    #[serde(default)]
    pub scoping_status: Option<String>,
    #[serde(default)]
    pub scoping_note: Option<String>,
    #[serde(default)]
    pub report_summary: Option<String>,
    #[serde(default)]
    pub key_risks: Vec<String>,
    #[serde(default)]
    pub mitigations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngagementStrategy {
    #[serde(default)]
    pub has_strategy: Option<bool>,
    #[serde(default)]
    pub stakeholders: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Site {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub suitability: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub achievability: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicySet {
    #[serde(default)]
    pub policies: Vec<Policy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

//! Workflow context the UI shares with the copilot.
//!
//! The product has two workflows (Estimates and Contracts). Whichever page
//! the user has open travels with every chat request so the copilot can
//! default tool parameters to the entity on screen.

use serde::{Deserialize, Serialize};

/// Which product workflow the user is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Workflow {
    Estimates,
    Contracts,
    /// No workflow page open (or one the copilot does not know about).
    #[default]
    General,
}

impl From<Option<String>> for Workflow {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some(w) if w.eq_ignore_ascii_case("estimates") => Self::Estimates,
            Some(w) if w.eq_ignore_ascii_case("contracts") => Self::Contracts,
            _ => Self::General,
        }
    }
}

impl From<Workflow> for Option<String> {
    fn from(value: Workflow) -> Self {
        match value {
            Workflow::Estimates => Some("estimates".into()),
            Workflow::Contracts => Some("contracts".into()),
            Workflow::General => None,
        }
    }
}

/// Snapshot of the page the user is viewing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
    #[serde(default)]
    pub workflow: Workflow,

    /// Estimate id or agreement id of the open entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// "project" or "agreement"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Whatever the page holds for the entity (name, stage, type, counterparty...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_data: Option<serde_json::Value>,

    /// Older clients send the project name/stage as top-level fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_project_stage: Option<String>,
}

impl WorkflowContext {
    /// A string field from `entity_data`, ignoring blanks.
    pub fn entity_field(&self, key: &str) -> Option<&str> {
        self.entity_data
            .as_ref()?
            .get(key)?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

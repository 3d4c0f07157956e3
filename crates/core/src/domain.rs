//! Rows the copilot reads from and writes to the remote store.
//!
//! Shapes mirror the store's tables. Columns the store may return as `null`
//! deserialize to their default so a half-filled estimate never fails to load.

use serde::{Deserialize, Deserializer, Serialize};

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `estimates` row: the project being priced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateSummary {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `estimate_artifacts` row: an uploaded discovery file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default, deserialize_with = "null_default")]
    pub filename: String,
    #[serde(default, deserialize_with = "null_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_default")]
    pub size_bytes: u64,
}

/// The outcome of listing an estimate's artifacts.
///
/// A failed load is kept as a value so summaries can surface it in-line.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactListing {
    Loaded(Vec<Artifact>),
    Unavailable(String),
}

impl ArtifactListing {
    /// The loaded artifacts; empty when the load failed.
    pub fn artifacts(&self) -> &[Artifact] {
        match self {
            Self::Loaded(artifacts) => artifacts,
            Self::Unavailable(_) => &[],
        }
    }
}

/// `estimate_wbs_rows` row. Freshly composed rows carry no `id` yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WbsRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub task_code: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_default")]
    pub hours: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub assumptions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl WbsRow {
    pub fn new(
        task_code: impl Into<String>,
        description: impl Into<String>,
        role: impl Into<String>,
        hours: f64,
        assumptions: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            task_code: task_code.into(),
            description: description.into(),
            role: role.into(),
            hours,
            assumptions: assumptions.into(),
            sort_order: None,
        }
    }
}

/// `estimate_quote` row: commercial terms captured in the Quote stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub delivery_timeline: Option<String>,
    #[serde(default)]
    pub delivered: Option<bool>,
}

/// `estimate_quote_rates` row: hourly rate for a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRate {
    #[serde(default, deserialize_with = "null_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_default")]
    pub rate: f64,
}

/// `estimate_quote_overrides` row: a per-task rate that beats the role rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateOverride {
    #[serde(default, deserialize_with = "null_default")]
    pub wbs_row_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub rate: f64,
}

/// One priced WBS task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub task_code: String,
    pub description: String,
    pub role: String,
    pub hours: f64,
    pub rate: f64,
    pub cost: f64,
}

/// Derived project total; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub currency: String,
    pub total_cost: f64,
    pub total_hours: f64,
    pub payment_terms: Option<String>,
    pub delivery_timeline: Option<String>,
    pub lines: Vec<QuoteLine>,
}

/// `contract_exemplars` row, plus the derived public download URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exemplar {
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub contract_type: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

/// `contract_agreements` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub agreement_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub counterparty: String,
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,
    /// Cached pointer to the newest version. Absent on legacy rows.
    #[serde(default)]
    pub current_version: Option<u32>,
    #[serde(default)]
    pub linked_estimate_id: Option<String>,
}

impl Agreement {
    pub fn is_sow(&self) -> bool {
        self.agreement_type.eq_ignore_ascii_case("SOW")
    }
}

/// `contract_versions` row: an immutable content snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementVersion {
    pub agreement_id: String,
    pub version_number: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// `contract_notes` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub note_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// `contract_review_drafts` row: counterparty text saved for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub agreement_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_columns_fall_back_to_defaults() {
        let row: WbsRow = serde_json::from_value(json!({
            "id": "w1",
            "task_code": null,
            "description": "Build API",
            "role": "Backend Engineer",
            "hours": null,
            "assumptions": null,
        }))
        .unwrap();
        assert_eq!(row.task_code, "");
        assert_eq!(row.hours, 0.0);
        assert_eq!(row.id.as_deref(), Some("w1"));
    }

    #[test]
    fn agreement_type_column_is_renamed() {
        let agreement: Agreement = serde_json::from_value(json!({
            "id": "a1",
            "type": "SOW",
            "counterparty": "Acme",
            "content": null,
            "current_version": 3,
        }))
        .unwrap();
        assert!(agreement.is_sow());
        assert_eq!(agreement.current_version, Some(3));
        assert!(agreement.content.is_empty());
        assert!(agreement.linked_estimate_id.is_none());
    }

    #[test]
    fn artifact_size_defaults_to_zero() {
        let artifact: Artifact =
            serde_json::from_value(json!({"filename": "brief.pdf", "size_bytes": null})).unwrap();
        assert_eq!(artifact.size_bytes, 0);
    }

    #[test]
    fn unavailable_listing_has_no_artifacts() {
        let listing = ArtifactListing::Unavailable("timeout".into());
        assert!(listing.artifacts().is_empty());
    }

    #[test]
    fn composed_row_omits_id_when_serialized() {
        let row = WbsRow::new("DISC-101", "Workshops", "Engagement Lead", 12.0, "Two sessions");
        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["hours"], json!(12.0));
    }
}

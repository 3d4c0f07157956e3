//! Policy review: turn agreement text into edit proposals.

use chrono::{SecondsFormat, Utc};
use scopepilot_core::domain::ReviewDraft;
use scopepilot_store::{COPILOT_AUTHOR, RemoteStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{ContractError, ContractResult};

const ANCHOR_CHARS: usize = 100;

const CHANGE_ORDER_CLAUSE: &str = "Any scope change request must be submitted in writing. VBT responds within five business days with fee, schedule, and service impacts.";

/// One suggested edit to an agreement.
///
/// Ids (`prop-1` .. `prop-4`) are only meaningful for the content they were
/// generated from. Regenerate from current content before selecting ids;
/// never cache them across content changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    /// Text to replace. When absent from the content the proposal is appended.
    pub before: String,
    pub after: String,
    pub rationale: String,
    pub section: String,
}

impl Proposal {
    fn new(id: &str, before: impl Into<String>, after: &str, rationale: &str, section: &str) -> Self {
        Self {
            id: id.into(),
            before: before.into(),
            after: after.into(),
            rationale: rationale.into(),
            section: section.into(),
        }
    }
}

/// Proposals for one agreement plus a one-line summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    pub agreement_id: Option<String>,
    pub summary: String,
    pub proposals: Vec<Proposal>,
}

impl ReviewReport {
    pub fn new(agreement_id: Option<String>, proposals: Vec<Proposal>) -> Self {
        let ids: Vec<&str> = proposals.iter().map(|p| p.id.as_str()).collect();
        let summary = format!(
            "Generated {} proposal(s): {}. Apply with apply_proposals using these ids.",
            proposals.len(),
            ids.join(", ")
        );
        Self {
            agreement_id,
            summary,
            proposals,
        }
    }
}

/// Scan `content` against the house policy rules.
///
/// Matching is case-insensitive; the emitted `before` fragments keep the
/// original casing of the rule text. Rule order and ids are fixed, and the
/// IP clause is only proposed when nothing else fired.
pub fn generate_proposals(content: &str) -> Vec<Proposal> {
    let lower = content.to_lowercase();
    let mut proposals = Vec::new();

    if lower.contains("net 60") {
        proposals.push(Proposal::new(
            "prop-1",
            "Payment terms: Net 60",
            "Payment terms: Net 30",
            "Policy requires Net 30 unless approved exception",
            "Payment Terms",
        ));
    }

    if lower.contains("30 days notice") || lower.contains("30-day") {
        proposals.push(Proposal::new(
            "prop-2",
            "Client may terminate with 30 days notice",
            "Client may terminate with 60 days notice",
            "Standard termination period per policy",
            "Termination",
        ));
    }

    if !lower.contains("change order") {
        let anchor = if content.is_empty() {
            String::new()
        } else {
            let head: String = content.chars().take(ANCHOR_CHARS).collect();
            format!("{head}...")
        };
        proposals.push(Proposal::new(
            "prop-3",
            anchor,
            CHANGE_ORDER_CLAUSE,
            "Change order process required per policy",
            "Change Management",
        ));
    }

    if proposals.is_empty() {
        proposals.push(Proposal::new(
            "prop-4",
            "Intellectual property rights remain with Client",
            "Intellectual property rights remain with Client, except for VBT's pre-existing IP and general methodologies.",
            "IP clause must protect VBT's pre-existing IP per policy",
            "Intellectual Property",
        ));
    }

    proposals
}

/// The text proposals for `agreement_id` are generated from: the latest
/// review draft when one exists, else the agreement's own content.
pub(crate) async fn review_source(store: &RemoteStore, agreement_id: &str, agreement_content: &str) -> String {
    let draft = store
        .read_or_default("latest review draft", store.latest_review_draft(agreement_id))
        .await;
    match draft {
        Some(d) if !d.content.is_empty() => d.content,
        _ => agreement_content.to_string(),
    }
}

/// Review an agreement.
///
/// Supplied `content` is stored as a new review draft first, so a later
/// apply regenerates the same proposals from the same text.
pub async fn review_agreement(
    store: &RemoteStore,
    agreement_id: &str,
    content: Option<&str>,
) -> ContractResult<ReviewReport> {
    let agreement = store
        .agreement(agreement_id)
        .await?
        .ok_or_else(|| ContractError::AgreementNotFound(agreement_id.to_string()))?;

    let source = match content.map(str::trim).filter(|c| !c.is_empty()) {
        Some(text) => {
            let draft = ReviewDraft {
                agreement_id: agreement_id.to_string(),
                content: text.to_string(),
                storage_path: None,
                uploaded_by: Some(COPILOT_AUTHOR.to_string()),
                created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            };
            if let Err(e) = store.save_review_draft(&draft).await {
                warn!(agreement_id, error = %e, "Failed to save review draft");
            }
            text.to_string()
        }
        None => review_source(store, agreement_id, &agreement.content).await,
    };

    let proposals = generate_proposals(&source);
    info!(agreement_id, count = proposals.len(), "Generated review proposals");
    Ok(ReviewReport::new(Some(agreement.id), proposals))
}

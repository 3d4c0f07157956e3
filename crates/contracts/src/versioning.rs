//! Persist applied proposals as a new agreement version.
//!
//! Writes are not transactional. Version row, agreement pointer and audit
//! note are three independent requests; a failure part-way leaves the
//! earlier writes in place. Two applies racing on the same agreement can
//! compute the same next version number.

use scopepilot_core::domain::AgreementVersion;
use scopepilot_core::error::StoreError;
use scopepilot_store::{COPILOT_AUTHOR, RemoteStore};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::redline::apply_proposals_to_content;
use crate::review::{generate_proposals, review_source};
use crate::{ContractError, ContractResult};

/// Version number for the next snapshot of an agreement.
///
/// Uses the cached `current` pointer when set, else the newest stored
/// version. Falls back to 1 when nothing is known or the lookup fails.
pub async fn next_version_number(store: &RemoteStore, agreement_id: &str, current: Option<u32>) -> u32 {
    if let Some(current) = current.filter(|v| *v > 0) {
        return current.saturating_add(1);
    }
    match store.latest_version_number(agreement_id).await {
        Ok(latest) => latest.unwrap_or(0).saturating_add(1),
        Err(StoreError::NotConfigured) => 1,
        Err(e) => {
            debug!(agreement_id, error = %e, "Version lookup failed, starting at 1");
            1
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplyRequest<'a> {
    pub agreement_id: &'a str,
    /// Comma-separated proposal ids
    pub proposal_ids: &'a str,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    pub message: String,
    pub agreement_id: String,
    pub new_version: u32,
    pub applied: Vec<String>,
    pub appended: Vec<String>,
}

fn parse_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Regenerate proposals for an agreement, apply the selected ones and store
/// the result as the next version.
pub async fn apply_selected_proposals(store: &RemoteStore, request: ApplyRequest<'_>) -> ContractResult<ApplyResult> {
    if !store.is_configured() {
        return Err(StoreError::NotConfigured.into());
    }

    let ids = parse_ids(request.proposal_ids);
    info!(agreement_id = request.agreement_id, proposal_ids = ?ids, "Applying proposals");
    if ids.is_empty() {
        return Err(ContractError::NoProposalIds);
    }

    let agreement = match store.agreement(request.agreement_id).await {
        Ok(Some(agreement)) => agreement,
        Ok(None) => return Err(ContractError::AgreementNotFound(request.agreement_id.to_string())),
        Err(e) => {
            warn!(agreement_id = request.agreement_id, error = %e, "Agreement lookup failed");
            return Err(ContractError::ApplyFailed(e));
        }
    };

    let source = review_source(store, &agreement.id, &agreement.content).await;
    let proposals = generate_proposals(&source);
    if proposals.is_empty() {
        return Err(ContractError::NoProposals);
    }

    let selected: Vec<_> = proposals.into_iter().filter(|p| ids.contains(&p.id)).collect();
    if selected.is_empty() {
        return Err(ContractError::NoProposalsMatched(ids));
    }

    let outcome = apply_proposals_to_content(&agreement.content, &selected);
    let version_number = next_version_number(store, &agreement.id, agreement.current_version).await;
    let version_notes = request
        .notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("Applied {} proposal(s) via Copilot.", selected.len()));
    let id_list = ids.join(", ");

    let version = AgreementVersion {
        agreement_id: agreement.id.clone(),
        version_number,
        content: outcome.content.clone(),
        notes: Some(version_notes),
        created_at: None,
    };
    store.insert_version(&version).await.map_err(ContractError::ApplyFailed)?;

    if let Err(e) = store
        .update_agreement_content(&agreement.id, &outcome.content, version_number)
        .await
    {
        warn!(
            agreement_id = %agreement.id,
            version_number,
            error = %e,
            "Version row written but agreement pointer not updated"
        );
        return Err(ContractError::ApplyFailed(e));
    }

    store
        .add_note(&agreement.id, &format!("Copilot applied proposals {id_list}."), COPILOT_AUTHOR)
        .await
        .map_err(ContractError::ApplyFailed)?;

    info!(agreement_id = %agreement.id, version_number, "Proposals applied");
    Ok(ApplyResult {
        message: format!("Applied proposals {id_list}. New version {version_number} created."),
        agreement_id: agreement.id,
        new_version: version_number,
        applied: outcome.applied,
        appended: outcome.appended,
    })
}

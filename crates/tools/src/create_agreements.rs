//! Draft an MSA and a linked SOW from an approved estimate.

use async_trait::async_trait;
use chrono::Utc;
use scopepilot_contracts::{MsaInput, SowInput};
use scopepilot_core::error::{StoreError, ToolError};
use scopepilot_core::tool::{Tool, ToolResult, optional_str};
use scopepilot_estimates::extract_requirement_highlights;
use scopepilot_store::NewAgreement;
use std::sync::Arc;
use tracing::{info, warn};

use crate::context::ToolContext;

const INITIAL_VERSION_NOTES: &str = "Initial version drafted by Copilot";

pub struct CreateAgreementsTool {
    ctx: Arc<ToolContext>,
}

impl CreateAgreementsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for CreateAgreementsTool {
    fn name(&self) -> &str {
        "create_agreements_from_estimate"
    }

    fn description(&self) -> &str {
        "Generate an MSA and SOW from an approved estimate, linking the SOW back to the estimate."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "estimate_id": { "type": "string", "description": "The approved estimate to draft from" },
                "counterparty": { "type": "string", "description": "Client legal name; defaults to the estimate owner" }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let store = &self.ctx.store;
        if !store.is_configured() {
            return Ok(ToolResult::failure(StoreError::NotConfigured.to_string()));
        }

        let Some(estimate_id) = optional_str(&arguments, "estimate_id") else {
            warn!("create_agreements_from_estimate called without estimate_id");
            return Ok(ToolResult::failure(
                "No estimate_id provided. Open an estimate detail page (URL /estimates/<id>) before \
                 requesting agreement generation, or pass the ID explicitly.",
            ));
        };
        let counterparty_arg = optional_str(&arguments, "counterparty");
        info!(estimate_id, counterparty = ?counterparty_arg, "Drafting agreements from estimate");

        let Some(estimate) = store.read_or_default("estimate", store.estimate(estimate_id)).await else {
            return Ok(ToolResult::failure(format!("Estimate {estimate_id} not found.")));
        };

        let (rows, quote) = self.ctx.quote_summary(estimate_id).await;
        if rows.is_empty() {
            return Ok(ToolResult::failure(
                "No WBS rows found for this estimate. Approve the Effort Estimate stage before drafting agreements.",
            ));
        }
        if quote.total_cost == 0.0 {
            return Ok(ToolResult::failure(
                "Quote data missing. Fill out the Quote stage (rates, payment terms, delivery timeline) \
                 before drafting agreements.",
            ));
        }

        let business_case = store
            .read_or_default("business case", store.business_case_content(estimate_id))
            .await;
        let requirements = store
            .read_or_default("requirements", store.requirements_content(estimate_id))
            .await;
        let highlights = extract_requirement_highlights(&requirements, 3);

        let counterparty = counterparty_arg
            .map(String::from)
            .or_else(|| estimate.owner.clone().filter(|o| !o.trim().is_empty()))
            .unwrap_or_else(|| format!("{} Client", estimate.name));

        let date = Utc::now().date_naive();
        let drafter = &self.ctx.drafter;
        let drafted = drafter
            .build_msa_content(&MsaInput {
                estimate: &estimate,
                business_case: &business_case,
                requirement_highlights: &highlights,
                quote: &quote,
                counterparty: &counterparty,
                date,
            })
            .and_then(|msa| {
                let sow = drafter.build_sow_content(&SowInput {
                    estimate: &estimate,
                    wbs_rows: &rows,
                    quote: &quote,
                    counterparty: &counterparty,
                    date,
                })?;
                Ok((msa, sow))
            });
        let (msa_content, sow_content) = match drafted {
            Ok(pair) => pair,
            Err(e) => return Ok(ToolResult::failure(format!("Unable to create agreements: {e}"))),
        };

        let created = async {
            let msa = store
                .create_agreement(NewAgreement {
                    agreement_type: "MSA".into(),
                    counterparty: counterparty.clone(),
                    content: msa_content,
                    linked_estimate_id: None,
                    version_notes: INITIAL_VERSION_NOTES.into(),
                })
                .await?;
            let sow = store
                .create_agreement(NewAgreement {
                    agreement_type: "SOW".into(),
                    counterparty: counterparty.clone(),
                    content: sow_content,
                    linked_estimate_id: Some(estimate_id.to_string()),
                    version_notes: INITIAL_VERSION_NOTES.into(),
                })
                .await?;
            Ok::<_, StoreError>((msa, sow))
        }
        .await;

        match created {
            Ok((msa, sow)) => Ok(ToolResult::json(serde_json::json!({
                "message": format!("Created MSA ({}) and SOW ({}) for {counterparty}.", msa.id, sow.id),
                "msa_id": msa.id,
                "sow_id": sow.id,
                "linked_estimate_id": estimate_id,
            }))),
            Err(e) => {
                warn!(estimate_id, error = %e, "Agreement creation failed");
                Ok(ToolResult::failure(format!("Unable to create agreements: {e}")))
            }
        }
    }
}

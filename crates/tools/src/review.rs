//! Agreement review and redlining tools.

use async_trait::async_trait;
use scopepilot_contracts::{ApplyRequest, apply_selected_proposals, review_agreement};
use scopepilot_core::error::ToolError;
use scopepilot_core::tool::{Tool, ToolResult, optional_str, required_str};
use std::sync::Arc;

use crate::context::{ToolContext, contract_failure};

fn encode(tool_name: &str, value: impl serde::Serialize) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool_name.to_string(),
        reason: e.to_string(),
    })
}

pub struct ReviewAgreementTool {
    ctx: Arc<ToolContext>,
}

impl ReviewAgreementTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ReviewAgreementTool {
    fn name(&self) -> &str {
        "review_agreement"
    }

    fn description(&self) -> &str {
        "Review an agreement against house policy and return redline proposals. \
         Pass `content` to review a counterparty draft; it is saved for later apply_proposals calls."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agreement_id": { "type": "string", "description": "The agreement to review" },
                "content": { "type": "string", "description": "Counterparty draft text to review instead of the stored content" }
            },
            "required": ["agreement_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let agreement_id = required_str(&arguments, "agreement_id")?;
        let content = optional_str(&arguments, "content");
        match review_agreement(&self.ctx.store, agreement_id, content).await {
            Ok(report) => {
                let summary = report.summary.clone();
                Ok(ToolResult::text(summary, Some(encode(self.name(), &report)?)))
            }
            Err(e) => Ok(contract_failure("review agreement", e)),
        }
    }
}

/// Accept ids as `"prop-1, prop-2"` or `["prop-1", "prop-2"]`.
fn proposal_ids_arg(arguments: &serde_json::Value) -> Result<String, ToolError> {
    match &arguments["proposal_ids"] {
        serde_json::Value::String(ids) => Ok(ids.clone()),
        serde_json::Value::Array(items) => Ok(items
            .iter()
            .filter_map(|item| item.as_str())
            .collect::<Vec<_>>()
            .join(",")),
        _ => Err(ToolError::InvalidArguments("Missing 'proposal_ids' parameter".into())),
    }
}

pub struct ApplyProposalsTool {
    ctx: Arc<ToolContext>,
}

impl ApplyProposalsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ApplyProposalsTool {
    fn name(&self) -> &str {
        "apply_proposals"
    }

    fn description(&self) -> &str {
        "Apply selected review proposals to an agreement and create a new version."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agreement_id": { "type": "string", "description": "The agreement to update" },
                "proposal_ids": {
                    "type": "string",
                    "description": "Comma-separated proposal ids from the latest review, e.g. \"prop-1,prop-3\""
                },
                "notes": { "type": "string", "description": "Optional notes for the new version" }
            },
            "required": ["agreement_id", "proposal_ids"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let agreement_id = required_str(&arguments, "agreement_id")?;
        let proposal_ids = proposal_ids_arg(&arguments)?;
        let request = ApplyRequest {
            agreement_id,
            proposal_ids: &proposal_ids,
            notes: optional_str(&arguments, "notes"),
        };
        match apply_selected_proposals(&self.ctx.store, request).await {
            Ok(result) => Ok(ToolResult::json(encode(self.name(), &result)?)),
            Err(e) => Ok(contract_failure("apply proposals", e)),
        }
    }
}

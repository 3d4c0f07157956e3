use async_trait::async_trait;
use scopepilot_contracts::validate_agreement;
use scopepilot_core::error::ToolError;
use scopepilot_core::tool::{Tool, ToolResult, required_str};
use std::sync::Arc;

use crate::context::{ToolContext, contract_failure};

/// Check a SOW's payment terms, hours, scope and timeline against its estimate.
pub struct ValidateAgreementTool {
    ctx: Arc<ToolContext>,
}

impl ValidateAgreementTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ValidateAgreementTool {
    fn name(&self) -> &str {
        "validate_agreement"
    }

    fn description(&self) -> &str {
        "Validate a SOW against its linked estimate and list discrepancies in payment terms, hours, scope and timeline."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agreement_id": { "type": "string", "description": "The SOW agreement to validate" }
            },
            "required": ["agreement_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let agreement_id = required_str(&arguments, "agreement_id")?;
        let report = match validate_agreement(&self.ctx.store, &self.ctx.pricing, agreement_id).await {
            Ok(report) => report,
            Err(e) => return Ok(contract_failure("validate agreement", e)),
        };
        let data = serde_json::to_value(&report).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().to_string(),
            reason: e.to_string(),
        })?;
        Ok(ToolResult::text(report.summary.clone(), Some(data)))
    }
}

use async_trait::async_trait;
use scopepilot_core::error::ToolError;
use scopepilot_core::tool::{Tool, ToolResult, required_str};
use std::sync::Arc;

use crate::context::ToolContext;

/// Price the approved WBS against the estimate's quote rates.
pub struct ProjectTotalTool {
    ctx: Arc<ToolContext>,
}

impl ProjectTotalTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ProjectTotalTool {
    fn name(&self) -> &str {
        "get_project_total"
    }

    fn description(&self) -> &str {
        "Calculate the project cost from WBS hours and role rates, returning totals and per-task lines."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "estimate_id": {
                    "type": "string",
                    "description": "The estimate to price"
                }
            },
            "required": ["estimate_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let estimate_id = required_str(&arguments, "estimate_id")?;
        let (rows, summary) = self.ctx.quote_summary(estimate_id).await;
        if rows.is_empty() {
            return Ok(ToolResult::json(serde_json::json!({
                "message": "No WBS rows available. Approve a WBS first.",
                "total_cost": 0,
            })));
        }
        let value = serde_json::to_value(&summary).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().to_string(),
            reason: e.to_string(),
        })?;
        Ok(ToolResult::json(value))
    }
}

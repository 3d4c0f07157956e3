//! WBS generation: compose rows from requirements and artifacts, then
//! replace the estimate's stored WBS.

use async_trait::async_trait;
use scopepilot_core::error::ToolError;
use scopepilot_core::tool::{Tool, ToolResult, required_str};
use scopepilot_estimates::{compose_wbs_rows, extract_requirement_highlights};
use std::sync::Arc;
use tracing::warn;

use crate::context::ToolContext;

const HIGHLIGHT_LIMIT: usize = 3;

pub struct GenerateWbsTool {
    ctx: Arc<ToolContext>,
}

impl GenerateWbsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GenerateWbsTool {
    fn name(&self) -> &str {
        "generate_wbs"
    }

    fn description(&self) -> &str {
        "Generate and persist a Work Breakdown Structure for the Effort Estimate stage."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "estimate_id": {
                    "type": "string",
                    "description": "The estimate to generate a WBS for"
                }
            },
            "required": ["estimate_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let estimate_id = required_str(&arguments, "estimate_id")?;
        let store = &self.ctx.store;
        if !store.is_configured() {
            return Ok(ToolResult::failure("Supabase credentials missing for WBS generation."));
        }

        let listing = store.artifact_listing(estimate_id).await;
        let requirements = store
            .read_or_default("requirements", store.requirements_content(estimate_id))
            .await;
        let highlights = extract_requirement_highlights(&requirements, HIGHLIGHT_LIMIT);
        let rows = compose_wbs_rows(listing.artifacts(), &highlights);

        if let Err(e) = store.replace_wbs_rows(estimate_id, &rows).await {
            warn!(estimate_id, error = %e, "WBS persistence failed");
            return Ok(ToolResult::failure(format!("Unable to save WBS rows: {e}")));
        }

        Ok(ToolResult::json(serde_json::json!({
            "message": format!("Generated {} WBS rows", rows.len()),
            "rows": rows,
        })))
    }
}

use async_trait::async_trait;
use scopepilot_core::error::ToolError;
use scopepilot_core::tool::{Tool, ToolResult, required_str};
use std::sync::Arc;

use crate::context::ToolContext;

/// Exemplar agreements of one type, newest first.
pub struct LoadExemplarsTool {
    ctx: Arc<ToolContext>,
}

impl LoadExemplarsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for LoadExemplarsTool {
    fn name(&self) -> &str {
        "load_exemplar_contracts"
    }

    fn description(&self) -> &str {
        "Load exemplar agreements (MSA, SOW, NDA, etc.) for use in contract drafting and reviews."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "contract_type": {
                    "type": "string",
                    "description": "Agreement type, e.g. MSA, SOW or NDA"
                }
            },
            "required": ["contract_type"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let contract_type = required_str(&arguments, "contract_type")?;
        let store = &self.ctx.store;
        let exemplars = store
            .read_or_default("exemplars", store.exemplars(contract_type))
            .await;
        Ok(ToolResult::json(serde_json::json!({
            "type": contract_type,
            "count": exemplars.len(),
            "exemplars": exemplars,
        })))
    }
}

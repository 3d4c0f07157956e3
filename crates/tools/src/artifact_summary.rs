//! Business Case and Requirements summaries built from uploaded artifacts.

use async_trait::async_trait;
use scopepilot_core::error::ToolError;
use scopepilot_core::tool::{Tool, ToolResult, required_str};
use scopepilot_estimates::{
    BUSINESS_CASE_INTRO, BUSINESS_CASE_OUTRO, REQUIREMENTS_INTRO, REQUIREMENTS_OUTRO,
    summarize_from_artifacts,
};
use std::sync::Arc;

use crate::context::ToolContext;

fn estimate_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "estimate_id": {
                "type": "string",
                "description": "The estimate whose artifacts to summarize"
            }
        },
        "required": ["estimate_id"]
    })
}

async fn summarize(ctx: &ToolContext, arguments: &serde_json::Value, intro: &str, outro: &str) -> Result<ToolResult, ToolError> {
    let estimate_id = required_str(arguments, "estimate_id")?;
    let listing = ctx.store.artifact_listing(estimate_id).await;
    let summary = summarize_from_artifacts(&listing, intro, outro);
    let data = serde_json::json!({
        "estimate_id": estimate_id,
        "artifact_count": listing.artifacts().len(),
        "summary": summary,
    });
    Ok(ToolResult::text(summary, Some(data)))
}

pub struct SummarizeBusinessCaseTool {
    ctx: Arc<ToolContext>,
}

impl SummarizeBusinessCaseTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for SummarizeBusinessCaseTool {
    fn name(&self) -> &str {
        "summarize_business_case"
    }

    fn description(&self) -> &str {
        "Summarize the uploaded artifacts into a Business Case outline."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        estimate_schema()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        summarize(&self.ctx, &arguments, BUSINESS_CASE_INTRO, BUSINESS_CASE_OUTRO).await
    }
}

pub struct SummarizeRequirementsTool {
    ctx: Arc<ToolContext>,
}

impl SummarizeRequirementsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for SummarizeRequirementsTool {
    fn name(&self) -> &str {
        "summarize_requirements"
    }

    fn description(&self) -> &str {
        "Translate the uploaded artifacts into a Requirements checklist."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        estimate_schema()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        summarize(&self.ctx, &arguments, REQUIREMENTS_INTRO, REQUIREMENTS_OUTRO).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{context_with, unconfigured_context};
    use scopepilot_store::{InMemoryBackend, tables};
    use serde_json::json;

    #[tokio::test]
    async fn lists_artifacts_under_business_case_intro() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .seed(
                tables::ARTIFACTS,
                vec![json!({
                    "estimate_id": "e1", "filename": "brief.pdf",
                    "created_at": "2025-01-02T00:00:00Z", "size_bytes": 2048
                })],
            )
            .await;
        let tool = SummarizeBusinessCaseTool::new(context_with(backend));

        let result = tool.execute(json!({"estimate_id": "e1"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("### Executive Summary"));
        assert!(result.output.contains("- brief.pdf (2048 bytes)"));
        assert_eq!(result.data.unwrap()["artifact_count"], 1);
    }

    #[tokio::test]
    async fn store_failure_shows_error_line() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_table(tables::ARTIFACTS).await;
        let tool = SummarizeRequirementsTool::new(context_with(backend));

        let result = tool.execute(json!({"estimate_id": "e1"})).await.unwrap();
        assert!(result.output.starts_with("### Requirements Backlog"));
        assert!(!result.output.contains(REQUIREMENTS_OUTRO));
    }

    #[tokio::test]
    async fn unconfigured_store_reports_no_artifacts() {
        let tool = SummarizeRequirementsTool::new(unconfigured_context());
        let result = tool.execute(json!({"estimate_id": "e1"})).await.unwrap();
        assert!(result.output.contains("No artifacts were found for this estimate."));
    }

    #[tokio::test]
    async fn missing_estimate_id_is_invalid() {
        let tool = SummarizeBusinessCaseTool::new(unconfigured_context());
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

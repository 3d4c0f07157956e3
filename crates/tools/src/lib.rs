//! Backend tools the copilot executes server-side.
//!
//! Each tool wraps one estimate or agreement operation. Tools share a
//! [`ToolContext`] holding the store client, pricing defaults and the
//! document drafter; they never touch process-global state.
//!
//! Business-rule failures come back as structured results
//! (`success = false`, `{"error": ...}`) so the model can explain them.

pub mod artifact_summary;
pub mod context;
pub mod create_agreements;
pub mod exemplars;
pub mod generate_wbs;
pub mod project_total;
pub mod pushbacks;
pub mod review;
pub mod validate_agreement;

use scopepilot_core::tool::ToolRegistry;
use std::sync::Arc;

pub use context::ToolContext;

/// Registry with every backend tool bound to `ctx`.
pub fn default_registry(ctx: Arc<ToolContext>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(artifact_summary::SummarizeBusinessCaseTool::new(ctx.clone())));
    registry.register(Box::new(artifact_summary::SummarizeRequirementsTool::new(ctx.clone())));
    registry.register(Box::new(generate_wbs::GenerateWbsTool::new(ctx.clone())));
    registry.register(Box::new(project_total::ProjectTotalTool::new(ctx.clone())));
    registry.register(Box::new(exemplars::LoadExemplarsTool::new(ctx.clone())));
    registry.register(Box::new(pushbacks::SummarizePushbacksTool::new(ctx.clone())));
    registry.register(Box::new(pushbacks::AddAgreementNoteTool::new(ctx.clone())));
    registry.register(Box::new(review::ReviewAgreementTool::new(ctx.clone())));
    registry.register(Box::new(review::ApplyProposalsTool::new(ctx.clone())));
    registry.register(Box::new(validate_agreement::ValidateAgreementTool::new(ctx.clone())));
    registry.register(Box::new(create_agreements::CreateAgreementsTool::new(ctx)));
    registry
}

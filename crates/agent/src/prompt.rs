//! System prompt for the chat node.

use scopepilot_core::agent::{Workflow, WorkflowContext};

/// Build the system prompt for the page the user has open.
///
/// Estimates pages name the project and stage and pin `estimate_id`;
/// contracts pages name the agreement and pin `agreement_id`.
pub fn build_system_prompt(ctx: &WorkflowContext, platform_name: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let entity_id = ctx.entity_id();

    match ctx.workflow {
        Workflow::Estimates => {
            let name = ctx
                .selected_project_name
                .as_deref()
                .or_else(|| ctx.entity_field("name"))
                .unwrap_or("Unknown Project");
            let stage = ctx
                .selected_project_stage
                .as_deref()
                .or_else(|| ctx.entity_field("stage"))
                .unwrap_or("Unknown Stage");
            parts.push("You are assisting with the Estimates workflow.".into());
            parts.push(format!("Current project: {name} (Stage: {stage})"));
            if let Some(id) = entity_id {
                parts.push(format!(
                    "Use estimate_id={id} for any tool parameters that require the current estimate."
                ));
            }
            parts.push(
                "You can help with: generating business cases, requirements, WBS, calculating totals, \
                 adjusting hours, adding line items, and drafting agreements from an approved estimate."
                    .into(),
            );
        }
        Workflow::Contracts => {
            let agreement_type = ctx.entity_field("type").unwrap_or("Unknown");
            let counterparty = ctx.entity_field("counterparty").unwrap_or("Unknown");
            parts.push("You are assisting with the Contracts workflow.".into());
            parts.push(format!("Current agreement: {agreement_type} for {counterparty}"));
            if let Some(id) = entity_id {
                parts.push(format!(
                    "Use agreement_id={id} for any tool parameters that require the current agreement."
                ));
            }
            parts.push(
                "You can help with: reviewing drafts, summarizing pushbacks, adding notes, applying proposals, \
                 and validating against estimates."
                    .into(),
            );
            parts.push(
                "Proposal ids only hold for the content they were generated from. \
                 Run review_agreement before apply_proposals whenever the draft may have changed."
                    .into(),
            );
        }
        Workflow::General => {
            parts.push(format!(
                "You are a helpful assistant for the {platform_name}."
            ));
            parts.push("You can assist with both Estimates and Contracts workflows.".into());
        }
    }

    if let Some(id) = entity_id {
        parts.push(format!("Current entity ID: {id}"));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLATFORM: &str = "VBT estimation and contracts platform";

    #[test]
    fn estimates_prompt_pins_estimate_id() {
        let ctx = WorkflowContext {
            workflow: Workflow::Estimates,
            entity_id: Some("est-42".into()),
            entity_type: Some("project".into()),
            entity_data: Some(json!({"name": "Apollo", "stage": "Quote"})),
            ..Default::default()
        };
        let prompt = build_system_prompt(&ctx, PLATFORM);
        assert!(prompt.starts_with("You are assisting with the Estimates workflow."));
        assert!(prompt.contains("Current project: Apollo (Stage: Quote)"));
        assert!(prompt.contains("Use estimate_id=est-42"));
        assert!(prompt.ends_with("Current entity ID: est-42"));
    }

    #[test]
    fn legacy_project_fields_take_precedence() {
        let ctx = WorkflowContext {
            workflow: Workflow::Estimates,
            entity_data: Some(json!({"name": "Old"})),
            selected_project_name: Some("Hermes".into()),
            ..Default::default()
        };
        let prompt = build_system_prompt(&ctx, PLATFORM);
        assert!(prompt.contains("Current project: Hermes (Stage: Unknown Stage)"));
        assert!(!prompt.contains("Current entity ID"));
    }

    #[test]
    fn contracts_prompt_names_agreement() {
        let ctx = WorkflowContext {
            workflow: Workflow::Contracts,
            entity_id: Some("agr-7".into()),
            entity_data: Some(json!({"type": "SOW", "counterparty": "Acme"})),
            ..Default::default()
        };
        let prompt = build_system_prompt(&ctx, PLATFORM);
        assert!(prompt.contains("Current agreement: SOW for Acme"));
        assert!(prompt.contains("Use agreement_id=agr-7"));
    }

    #[test]
    fn general_prompt_uses_platform_name() {
        let prompt = build_system_prompt(&WorkflowContext::default(), PLATFORM);
        assert_eq!(
            prompt,
            "You are a helpful assistant for the VBT estimation and contracts platform.\n\
             You can assist with both Estimates and Contracts workflows."
        );
    }
}

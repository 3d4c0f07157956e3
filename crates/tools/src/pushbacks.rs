//! Agreement notes: read them back as a pushback summary, or add one.

use async_trait::async_trait;
use scopepilot_core::domain::AgreementNote;
use scopepilot_core::error::{StoreError, ToolError};
use scopepilot_core::tool::{Tool, ToolResult, required_str};
use scopepilot_store::COPILOT_AUTHOR;
use std::sync::Arc;
use tracing::warn;

use crate::context::ToolContext;

const NOTE_FETCH_LIMIT: usize = 10;
const NOTES_SHOWN: usize = 5;

fn pushback_summary(agreement_type: Option<&str>, counterparty: Option<&str>, notes: &[AgreementNote]) -> String {
    let mut parts = vec![
        format!(
            "### Pushback Summary for {} - {}",
            agreement_type.unwrap_or("Agreement"),
            counterparty.unwrap_or("Unknown")
        ),
        String::new(),
    ];
    if notes.is_empty() {
        parts.push("No notes found.".to_string());
    } else {
        parts.push("**Recent Notes:**".to_string());
        parts.extend(notes.iter().take(NOTES_SHOWN).map(|n| format!("- {}", n.note_text)));
    }
    parts.join("\n")
}

pub struct SummarizePushbacksTool {
    ctx: Arc<ToolContext>,
}

impl SummarizePushbacksTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn load(&self, agreement_id: &str) -> Result<(String, usize), StoreError> {
        let store = &self.ctx.store;
        let notes = store.notes(agreement_id, NOTE_FETCH_LIMIT).await?;
        let agreement = store.agreement(agreement_id).await?;
        let (agreement_type, counterparty) = match &agreement {
            Some(a) => (Some(a.agreement_type.as_str()), Some(a.counterparty.as_str())),
            None => (None, None),
        };
        Ok((pushback_summary(agreement_type, counterparty, &notes), notes.len()))
    }
}

#[async_trait]
impl Tool for SummarizePushbacksTool {
    fn name(&self) -> &str {
        "summarize_pushbacks"
    }

    fn description(&self) -> &str {
        "Summarize policy conflicts and pushbacks recorded in an agreement's notes."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agreement_id": { "type": "string", "description": "The agreement to summarize" }
            },
            "required": ["agreement_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let agreement_id = required_str(&arguments, "agreement_id")?;
        if !self.ctx.store.is_configured() {
            return Ok(ToolResult::failure(StoreError::NotConfigured.to_string()));
        }

        match self.load(agreement_id).await {
            Ok((summary, note_count)) => Ok(ToolResult::text(
                summary.clone(),
                Some(serde_json::json!({ "summary": summary, "note_count": note_count })),
            )),
            Err(e) => {
                warn!(agreement_id, error = %e, "Pushback summary failed");
                let message = format!("Unable to summarize pushbacks: {e}");
                Ok(ToolResult {
                    call_id: String::new(),
                    success: false,
                    output: message.clone(),
                    data: Some(serde_json::json!({
                        "error": message,
                        "summary": "Error loading agreement data.",
                    })),
                })
            }
        }
    }
}

pub struct AddAgreementNoteTool {
    ctx: Arc<ToolContext>,
}

impl AddAgreementNoteTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for AddAgreementNoteTool {
    fn name(&self) -> &str {
        "add_agreement_note"
    }

    fn description(&self) -> &str {
        "Add a note to an agreement."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "agreement_id": { "type": "string", "description": "The agreement to annotate" },
                "note": { "type": "string", "description": "Note text" }
            },
            "required": ["agreement_id", "note"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let agreement_id = required_str(&arguments, "agreement_id")?;
        let note = required_str(&arguments, "note")?;
        match self.ctx.store.add_note(agreement_id, note, COPILOT_AUTHOR).await {
            Ok(_) => Ok(ToolResult::json(serde_json::json!({
                "message": format!("Note added to agreement {agreement_id}"),
                "note": note,
            }))),
            Err(StoreError::NotConfigured) => Ok(ToolResult::failure(StoreError::NotConfigured.to_string())),
            Err(e) => {
                warn!(agreement_id, error = %e, "Adding note failed");
                Ok(ToolResult::failure(format!("Unable to add note: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::{context_with, unconfigured_context};
    use scopepilot_store::{InMemoryBackend, tables};
    use serde_json::json;

    #[tokio::test]
    async fn summary_shows_five_newest_of_ten() {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .seed(
                tables::AGREEMENTS,
                vec![json!({"id": "a1", "type": "MSA", "counterparty": "Acme", "content": ""})],
            )
            .await;
        let notes = (1..=7)
            .map(|i| json!({"agreement_id": "a1", "note_text": format!("note {i}"),
                             "created_at": format!("2025-03-0{i}T00:00:00Z")}))
            .collect();
        backend.seed(tables::NOTES, notes).await;
        let tool = SummarizePushbacksTool::new(context_with(backend));

        let result = tool.execute(json!({"agreement_id": "a1"})).await.unwrap();
        assert!(result.output.starts_with("### Pushback Summary for MSA - Acme\n\n**Recent Notes:**\n- note 7"));
        assert!(result.output.contains("- note 3"));
        assert!(!result.output.contains("- note 2"));
        assert_eq!(result.data.unwrap()["note_count"], 7);
    }

    #[tokio::test]
    async fn unknown_agreement_without_notes() {
        let backend = Arc::new(InMemoryBackend::new());
        let tool = SummarizePushbacksTool::new(context_with(backend));
        let result = tool.execute(json!({"agreement_id": "zz"})).await.unwrap();
        assert_eq!(
            result.output,
            "### Pushback Summary for Agreement - Unknown\n\nNo notes found."
        );
    }

    #[tokio::test]
    async fn store_error_keeps_fallback_summary() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_table(tables::NOTES).await;
        let tool = SummarizePushbacksTool::new(context_with(backend));
        let result = tool.execute(json!({"agreement_id": "a1"})).await.unwrap();
        assert!(!result.success);
        let data = result.data.unwrap();
        assert_eq!(data["summary"], "Error loading agreement data.");
        assert!(data["error"].as_str().unwrap().starts_with("Unable to summarize pushbacks:"));
    }

    #[tokio::test]
    async fn note_is_stored_with_copilot_author() {
        let backend = Arc::new(InMemoryBackend::new());
        let tool = AddAgreementNoteTool::new(context_with(backend.clone()));
        let result = tool
            .execute(json!({"agreement_id": "a1", "note": "Client wants Net 45"}))
            .await
            .unwrap();
        assert_eq!(result.data.unwrap()["message"], "Note added to agreement a1");

        let stored = backend.rows(tables::NOTES).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["created_by"], "Copilot");
        assert_eq!(stored[0]["note_text"], "Client wants Net 45");
    }

    #[tokio::test]
    async fn notes_need_credentials() {
        let ctx = unconfigured_context();
        let add = AddAgreementNoteTool::new(ctx.clone());
        let result = add.execute(json!({"agreement_id": "a1", "note": "x"})).await.unwrap();
        assert_eq!(result.error_message(), Some("Supabase credentials missing"));

        let summarize = SummarizePushbacksTool::new(ctx);
        let result = summarize.execute(json!({"agreement_id": "a1"})).await.unwrap();
        assert_eq!(result.error_message(), Some("Supabase credentials missing"));
    }
}

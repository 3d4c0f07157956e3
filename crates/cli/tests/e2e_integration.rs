//! End-to-end integration tests for the ScopePilot copilot.
//!
//! These tests drive the full pipeline from a user turn through the copilot
//! graph, the backend tools and the store, with a scripted provider standing
//! in for the LLM and an in-memory backend standing in for Supabase.

use std::sync::{Arc, Mutex};

use scopepilot_agent::CopilotGraph;
use scopepilot_config::AppConfig;
use scopepilot_core::agent::{Workflow, WorkflowContext};
use scopepilot_core::error::ProviderError;
use scopepilot_core::event::{DomainEvent, EventBus};
use scopepilot_core::message::{Conversation, Message, MessageToolCall, Role};
use scopepilot_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
use scopepilot_core::tool::{ToolCall, ToolRegistry};
use scopepilot_store::{InMemoryBackend, RemoteStore, tables};
use scopepilot_tools::{ToolContext, default_registry};
use serde_json::json;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        requests.push(request);
        if index >= responses.len() {
            panic!("ScriptedProvider exhausted: call #{index}, have {}", responses.len());
        }
        Ok(responses[index].clone())
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(name: &str, args: serde_json::Value) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = vec![make_tool_call(name, args)];
    ProviderResponse {
        message: msg,
        usage: None,
        model: "mock".into(),
    }
}

fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

fn registry_over(store: RemoteStore) -> Arc<ToolRegistry> {
    let ctx = Arc::new(ToolContext::new(store, &AppConfig::default()).unwrap());
    Arc::new(default_registry(ctx))
}

fn graph_with(provider: Arc<ScriptedProvider>, tools: Arc<ToolRegistry>, bus: Arc<EventBus>) -> CopilotGraph {
    CopilotGraph::from_config(&AppConfig::default(), provider, tools, bus)
}

async fn estimate_backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .seed(tables::ESTIMATES, vec![json!({"id": "e1", "name": "Apollo", "owner": "Globex", "stage": "Effort Estimate"})])
        .await;
    backend
        .seed(
            tables::REQUIREMENTS,
            vec![json!({"estimate_id": "e1", "content": "<p>Self-service analytics</p>"})],
        )
        .await;
    backend
        .seed(
            tables::ARTIFACTS,
            vec![json!({"estimate_id": "e1", "filename": "rfp.pdf",
                        "created_at": "2025-04-01T09:00:00Z", "size_bytes": 4096})],
        )
        .await;
    backend
}

fn estimates_thread(text: &str) -> Conversation {
    let mut conversation = Conversation::with_context(WorkflowContext {
        workflow: Workflow::Estimates,
        entity_id: Some("e1".into()),
        entity_type: Some("project".into()),
        entity_data: Some(json!({"name": "Apollo", "stage": "Effort Estimate"})),
        ..Default::default()
    });
    conversation.push(Message::user(text));
    conversation
}

fn tool_messages(conversation: &Conversation) -> Vec<&Message> {
    conversation.messages.iter().filter(|m| m.role == Role::Tool).collect()
}

// ── E2E: Estimates workflow ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_generate_wbs_then_price_it() {
    let backend = estimate_backend().await;
    let tools = registry_over(RemoteStore::new(backend.clone(), "http://store.test"));
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let provider = ScriptedProvider::new(vec![
        tool_response("generate_wbs", json!({"estimate_id": "e1"})),
        tool_response("get_project_total", json!({"estimate_id": "e1"})),
        text_response("The WBS is saved. The project totals USD 14,400.00."),
    ]);
    let graph = graph_with(provider.clone(), tools, bus);

    let mut conversation = estimates_thread("Generate the WBS and tell me the total");
    let outcome = graph.run(&mut conversation, &[]).await.unwrap();

    assert_eq!(outcome.reply, "The WBS is saved. The project totals USD 14,400.00.");
    assert_eq!(outcome.tool_iterations, 2);
    assert_eq!(provider.calls(), 3);

    // 5 skeleton rows + 1 requirement + 1 artifact
    let rows = backend.rows(tables::WBS_ROWS).await;
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[5]["task_code"], "REQ-001");
    assert_eq!(rows[6]["task_code"], "ART-RFP");

    // 96 hours at the default 150/h
    let results = tool_messages(&conversation);
    assert!(results[0].content.contains("Generated 7 WBS rows"));
    assert!(results[1].content.contains("14400"));

    let system = &provider.last_request().messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.contains("Apollo"));
    assert!(system.content.contains("estimate_id=e1"));

    let mut executed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::ToolExecuted { tool_name, success, .. } = event.as_ref() {
            assert!(success);
            executed.push(tool_name.clone());
        }
    }
    assert_eq!(executed, vec!["generate_wbs", "get_project_total"]);
}

#[tokio::test]
async fn e2e_estimate_to_agreements_to_validation() {
    let backend = estimate_backend().await;
    let tools = registry_over(RemoteStore::new(backend.clone(), "http://store.test"));

    // Turn 1: approve a WBS
    let provider = ScriptedProvider::new(vec![
        tool_response("generate_wbs", json!({"estimate_id": "e1"})),
        text_response("WBS generated."),
    ]);
    let graph = graph_with(provider, tools.clone(), Arc::new(EventBus::default()));
    let mut conversation = estimates_thread("Generate the WBS");
    graph.run(&mut conversation, &[]).await.unwrap();

    // Turn 2: draft contracts on the same thread
    conversation.push(Message::user("Now draft the MSA and SOW"));
    let provider = ScriptedProvider::new(vec![
        tool_response("create_agreements_from_estimate", json!({"estimate_id": "e1"})),
        text_response("Both agreements are drafted."),
    ]);
    let graph = graph_with(provider.clone(), tools.clone(), Arc::new(EventBus::default()));
    let outcome = graph.run(&mut conversation, &[]).await.unwrap();
    assert_eq!(outcome.reply, "Both agreements are drafted.");
    assert_eq!(provider.calls(), 2);
    // Turn 1 (user, call, result, reply) + turn 2 (user, call, result) behind the system prompt
    assert_eq!(provider.last_request().messages.len(), 8);

    let agreements = backend.rows(tables::AGREEMENTS).await;
    assert_eq!(agreements.len(), 2);
    let msa = agreements.iter().find(|a| a["type"] == "MSA").unwrap();
    let sow = agreements.iter().find(|a| a["type"] == "SOW").unwrap();
    assert_eq!(msa["counterparty"], "Globex");
    assert!(msa["content"].as_str().unwrap().contains("Self-service analytics"));
    assert!(msa["content"].as_str().unwrap().contains("14,400"));
    assert_eq!(sow["linked_estimate_id"], "e1");
    assert_eq!(backend.rows(tables::VERSIONS).await.len(), 2);

    // Validate the SOW through the same registry the frontend would call
    let sow_id = sow["id"].as_str().unwrap().to_string();
    let result = tools
        .execute(&ToolCall {
            id: "direct-1".into(),
            name: "validate_agreement".into(),
            arguments: json!({"agreement_id": sow_id}),
        })
        .await
        .unwrap();
    assert!(result.success, "{}", result.output);
    let report = result.data.unwrap();
    assert!(report["valid"].is_boolean());
    assert!(report["discrepancies"].is_array());

    let msa_id = msa["id"].as_str().unwrap().to_string();
    let result = tools
        .execute(&ToolCall {
            id: "direct-2".into(),
            name: "validate_agreement".into(),
            arguments: json!({"agreement_id": msa_id}),
        })
        .await
        .unwrap();
    assert!(!result.success);
}

// ── E2E: Contracts workflow ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_review_then_apply_creates_next_version() {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .seed(
            tables::AGREEMENTS,
            vec![json!({"id": "a1", "type": "MSA", "counterparty": "Acme", "current_version": 1,
                        "content": "Payment terms: Net 60. Either party may terminate with 30 days notice."})],
        )
        .await;
    backend
        .seed(
            tables::VERSIONS,
            vec![json!({"agreement_id": "a1", "version_number": 1, "content": "v1"})],
        )
        .await;
    let tools = registry_over(RemoteStore::new(backend.clone(), "http://store.test"));

    let provider = ScriptedProvider::new(vec![
        tool_response("review_agreement", json!({"agreement_id": "a1"})),
        tool_response("apply_proposals", json!({"agreement_id": "a1", "proposal_ids": ["prop-1"]})),
        text_response("Applied the payment terms change as version 2."),
    ]);
    let graph = graph_with(provider, tools, Arc::new(EventBus::default()));

    let mut conversation = Conversation::with_context(WorkflowContext {
        workflow: Workflow::Contracts,
        entity_id: Some("a1".into()),
        entity_type: Some("agreement".into()),
        entity_data: Some(json!({"type": "MSA", "counterparty": "Acme"})),
        ..Default::default()
    });
    conversation.push(Message::user("Review this and apply the payment terms fix"));
    let outcome = graph.run(&mut conversation, &[]).await.unwrap();
    assert_eq!(outcome.tool_iterations, 2);

    let results = tool_messages(&conversation);
    assert!(results[0].content.contains("prop-1"));
    assert!(results[0].content.contains("prop-2"));
    assert!(results[1].content.contains("New version 2 created"));

    let agreement = &backend.rows(tables::AGREEMENTS).await[0];
    let content = agreement["content"].as_str().unwrap();
    assert!(content.contains("Net 30"));
    assert!(!content.contains("Net 60"));
    assert_eq!(agreement["current_version"], 2);

    let versions = backend.rows(tables::VERSIONS).await;
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1]["version_number"], 2);
}

// ── E2E: Client tools ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_client_tool_round_trip() {
    let tools = registry_over(RemoteStore::unconfigured());
    let navigate = ToolDefinition {
        name: "navigateToStage".into(),
        description: "Move the estimate page to a stage".into(),
        parameters: json!({"type": "object", "properties": {"stage": {"type": "string"}}}),
    };

    // Turn 1 ends on the client call
    let provider = ScriptedProvider::new(vec![tool_response("navigateToStage", json!({"stage": "Quote"}))]);
    let graph = graph_with(provider.clone(), tools.clone(), Arc::new(EventBus::default()));
    let mut conversation = estimates_thread("Take me to the quote");
    let outcome = graph.run(&mut conversation, std::slice::from_ref(&navigate)).await.unwrap();
    assert_eq!(outcome.pending_client_calls.len(), 1);
    assert_eq!(provider.last_request().parallel_tool_calls, Some(false));
    assert!(provider.last_request().tools.iter().any(|t| t.name == "navigateToStage"));

    // The frontend runs it and resumes the thread
    let call_id = outcome.pending_client_calls[0].id.clone();
    conversation.push(Message::tool_result(call_id, "Navigated to Quote"));
    let provider = ScriptedProvider::new(vec![text_response("You're on the Quote stage now.")]);
    let graph = graph_with(provider.clone(), tools, Arc::new(EventBus::default()));
    let outcome = graph.run(&mut conversation, &[navigate]).await.unwrap();

    assert_eq!(outcome.reply, "You're on the Quote stage now.");
    assert!(outcome.pending_client_calls.is_empty());
    // system + user + assistant call + client result
    assert_eq!(provider.last_request().messages.len(), 4);
}

// ── E2E: Degraded store ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_missing_credentials_degrade_gracefully() {
    let tools = registry_over(RemoteStore::unconfigured());
    let provider = ScriptedProvider::new(vec![
        tool_response("summarize_requirements", json!({"estimate_id": "e1"})),
        tool_response("generate_wbs", json!({"estimate_id": "e1"})),
        text_response("I can't reach the estimate store right now."),
    ]);
    let graph = graph_with(provider, tools, Arc::new(EventBus::default()));

    let mut conversation = estimates_thread("Summarize and build the WBS");
    let outcome = graph.run(&mut conversation, &[]).await.unwrap();
    assert_eq!(outcome.reply, "I can't reach the estimate store right now.");

    let results = tool_messages(&conversation);
    // Reads degrade to empty
    assert!(results[0].content.contains("No artifacts were found for this estimate."));
    // Writes are refused with a structured error
    assert!(results[1].content.contains("Supabase credentials missing for WBS generation."));
}

//! HTTP API v1, the surface the frontend's agent runtime talks to.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`: Run one copilot turn over the supplied thread
//! - `GET /v1/tools`: List backend tool definitions
//! - `POST /v1/tools/{name}`: Invoke one backend tool directly

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use scopepilot_agent::CopilotGraph;
use scopepilot_core::agent::WorkflowContext;
use scopepilot_core::error::{Error, ToolError};
use scopepilot_core::message::{Conversation, ConversationId, Message, MessageToolCall};
use scopepilot_core::provider::ToolDefinition;
use scopepilot_core::tool::{ToolCall, ToolRegistry, ToolResult};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub graph: Arc<CopilotGraph>,
    pub tools: Arc<ToolRegistry>,
}

pub type SharedApiState = Arc<ApiV1State>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/tools", get(list_tools_handler))
        .route("/tools/{name}", post(invoke_tool_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    /// Echoed back; the thread itself travels in `messages`.
    #[serde(default)]
    conversation_id: Option<String>,
    messages: Vec<Message>,
    #[serde(default)]
    context: WorkflowContext,
    /// Tools the frontend executes itself
    #[serde(default)]
    client_tools: Vec<ToolDefinition>,
}

#[derive(Serialize, Deserialize)]
struct ChatResponse {
    conversation_id: String,
    reply: String,
    pending_tool_calls: Vec<MessageToolCall>,
    tool_iterations: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct ToolListResponse {
    tools: Vec<ToolDefinition>,
    count: usize,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: error.into() }))
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.messages.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "messages must not be empty"));
    }

    let mut conversation = Conversation::with_context(payload.context);
    if let Some(id) = payload.conversation_id.as_deref().filter(|id| !id.trim().is_empty()) {
        conversation.id = ConversationId::from(id);
    }
    conversation.messages = payload.messages;

    info!(
        conversation_id = %conversation.id,
        messages = conversation.messages.len(),
        client_tools = payload.client_tools.len(),
        "v1/chat request"
    );

    match state.graph.run(&mut conversation, &payload.client_tools).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            conversation_id: conversation.id.to_string(),
            reply: outcome.reply,
            pending_tool_calls: outcome.pending_client_calls,
            tool_iterations: outcome.tool_iterations,
            messages: conversation.messages,
        })),
        Err(Error::Provider(e)) => {
            warn!(error = %e, "Provider call failed");
            Err(api_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
        Err(e) => {
            tracing::error!(error = %e, "Copilot turn failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn list_tools_handler(State(state): State<SharedApiState>) -> Json<ToolListResponse> {
    let tools = state.tools.definitions();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

/// Structured failures (`success = false`) are still 200: the payload is
/// the answer. Only unknown tools and bad arguments are HTTP errors.
async fn invoke_tool_handler(
    State(state): State<SharedApiState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolResult>, ApiError> {
    let arguments = if body.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid JSON arguments: {e}")))?
    };
    let call = ToolCall {
        id: format!("direct-{}", ConversationId::new()),
        name,
        arguments,
    };

    info!(tool = %call.name, "v1/tools invocation");
    match state.tools.execute(&call).await {
        Ok(result) => Ok(Json(result)),
        Err(e @ ToolError::NotFound(_)) => Err(api_error(StatusCode::NOT_FOUND, e.to_string())),
        Err(e @ ToolError::InvalidArguments(_)) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            warn!(tool = %call.name, error = %e, "Direct tool invocation failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use scopepilot_config::AppConfig;
    use scopepilot_core::error::ProviderError;
    use scopepilot_core::event::EventBus;
    use scopepilot_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use scopepilot_store::{InMemoryBackend, RemoteStore, tables};
    use scopepilot_tools::{ToolContext, default_registry};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replays canned assistant messages; errors once exhausted.
    struct MockProvider {
        replies: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let message = self.replies.lock().unwrap().pop().ok_or(ProviderError::ApiError {
                status_code: 500,
                message: "no scripted reply".into(),
            })?;
            Ok(ProviderResponse {
                message,
                usage: None,
                model: "mock-model".into(),
            })
        }
    }

    fn tool_call(name: &str, arguments: serde_json::Value) -> Message {
        let mut message = Message::assistant("");
        message.tool_calls.push(MessageToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: arguments.to_string(),
        });
        message
    }

    async fn test_api_state(mut replies: Vec<Message>) -> SharedApiState {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .seed(
                tables::ARTIFACTS,
                vec![serde_json::json!({
                    "estimate_id": "est-1", "filename": "rfp.pdf",
                    "created_at": "2025-03-01T00:00:00Z", "size_bytes": 512
                })],
            )
            .await;
        let config = AppConfig::default();
        let store = RemoteStore::new(backend, "http://store.test");
        let ctx = Arc::new(ToolContext::new(store, &config).unwrap());
        let tools = Arc::new(default_registry(ctx));

        replies.reverse();
        let provider = Arc::new(MockProvider {
            replies: Mutex::new(replies),
        });
        let graph = CopilotGraph::from_config(&config, provider, tools.clone(), Arc::new(EventBus::default()));
        Arc::new(ApiV1State {
            graph: Arc::new(graph),
            tools,
        })
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn list_tools() {
        let app = v1_router(test_api_state(vec![]).await);

        let req = Request::builder().uri("/tools").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let list: ToolListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.count, 11);
        assert!(list.tools.iter().any(|t| t.name == "apply_proposals"));
    }

    #[tokio::test]
    async fn chat_runs_backend_tool_and_returns_thread() {
        let state = test_api_state(vec![
            tool_call("summarize_requirements", serde_json::json!({"estimate_id": "est-1"})),
            Message::assistant("Here is the requirements checklist."),
        ])
        .await;
        let app = v1_router(state);

        let body = serde_json::json!({
            "conversation_id": "thread-9",
            "messages": [{"role": "user", "content": "Summarize the requirements"}],
            "context": {"workflow": "estimates", "entity_id": "est-1"}
        });
        let response = app.oneshot(post_json("/chat", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let chat: ChatResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(chat.conversation_id, "thread-9");
        assert_eq!(chat.reply, "Here is the requirements checklist.");
        assert_eq!(chat.tool_iterations, 1);
        assert!(chat.pending_tool_calls.is_empty());
        // user, assistant call, tool result, assistant reply
        assert_eq!(chat.messages.len(), 4);
        assert!(chat.messages[2].content.contains("rfp.pdf"));
    }

    #[tokio::test]
    async fn chat_returns_pending_client_calls() {
        let state = test_api_state(vec![tool_call("openAgreement", serde_json::json!({"id": "agr-1"}))]).await;
        let app = v1_router(state);

        let body = serde_json::json!({
            "messages": [{"role": "user", "content": "Open the agreement"}],
            "client_tools": [{"name": "openAgreement", "description": "Open a page", "parameters": {"type": "object"}}]
        });
        let response = app.oneshot(post_json("/chat", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let chat: ChatResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(chat.pending_tool_calls.len(), 1);
        assert_eq!(chat.pending_tool_calls[0].name, "openAgreement");
    }

    #[tokio::test]
    async fn chat_rejects_empty_thread() {
        let app = v1_router(test_api_state(vec![]).await);
        let response = app
            .oneshot(post_json("/chat", serde_json::json!({"messages": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_provider_failure_is_bad_gateway() {
        let app = v1_router(test_api_state(vec![]).await);
        let body = serde_json::json!({"messages": [{"role": "user", "content": "hi"}]});
        let response = app.oneshot(post_json("/chat", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn invoke_tool_directly() {
        let app = v1_router(test_api_state(vec![]).await);
        let response = app
            .oneshot(post_json(
                "/tools/summarize_business_case",
                serde_json::json!({"estimate_id": "est-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let result: ToolResult = serde_json::from_slice(&body).unwrap();
        assert!(result.success);
        assert!(result.output.contains("rfp.pdf"));
        assert!(result.call_id.starts_with("direct-"));
    }

    #[tokio::test]
    async fn invoke_unknown_tool_is_not_found() {
        let app = v1_router(test_api_state(vec![]).await);
        let response = app
            .oneshot(post_json("/tools/shell", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invoke_tool_missing_argument_is_bad_request() {
        let app = v1_router(test_api_state(vec![]).await);
        let response = app
            .oneshot(post_json("/tools/generate_wbs", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

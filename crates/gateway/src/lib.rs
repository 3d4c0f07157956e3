//! HTTP API gateway for ScopePilot.
//!
//! Exposes the health check and the v1 API (chat turns, tool listing,
//! direct tool invocation) the frontend's agent runtime calls.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};

use scopepilot_agent::CopilotGraph;
use scopepilot_config::{AppConfig, GatewayConfig};
use scopepilot_core::event::{DomainEvent, EventBus};
use scopepilot_core::tool::ToolRegistry;
use scopepilot_store::RemoteStore;
use scopepilot_tools::{ToolContext, default_registry};

/// Request bodies above this are rejected.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// State behind `/health`.
pub struct HealthState {
    pub store_configured: bool,
    pub store_backend: String,
    pub tool_count: usize,
}

/// Everything a running gateway shares between requests.
pub struct Services {
    pub store: RemoteStore,
    pub tools: Arc<ToolRegistry>,
    pub graph: Arc<CopilotGraph>,
    pub event_bus: Arc<EventBus>,
}

impl Services {
    /// Wire store, tools, provider and graph from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = RemoteStore::from_config(&config.store)?;
        let ctx = Arc::new(ToolContext::new(store.clone(), config)?);
        let tools = Arc::new(default_registry(ctx));

        let router = scopepilot_providers::build_from_config(config);
        let provider = router.default().ok_or_else(|| {
            format!(
                "No '{}' provider configured. Set SCOPEPILOT_API_KEY or OPENAI_API_KEY.",
                config.default_provider
            )
        })?;

        let event_bus = Arc::new(EventBus::default());
        let graph = CopilotGraph::from_config(config, provider, tools.clone(), event_bus.clone());

        Ok(Self {
            store,
            tools,
            graph: Arc::new(graph),
            event_bus,
        })
    }
}

/// Build the full router: `/health` plus `/v1`, with body limit, CORS and
/// HTTP trace layers.
pub fn build_router(services: &Services, gateway: &GatewayConfig) -> Router {
    let health = Arc::new(HealthState {
        store_configured: services.store.is_configured(),
        store_backend: services.store.backend_name().to_string(),
        tool_count: services.tools.len(),
    });
    let api_state = Arc::new(api_v1::ApiV1State {
        graph: services.graph.clone(),
        tools: services.tools.clone(),
    });

    Router::new()
        .route("/health", get(health_handler))
        .with_state(health)
        .nest("/v1", api_v1::v1_router(api_state))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors_layer(&gateway.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Exact origins when configured, any origin otherwise.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Log every domain event until the bus closes.
pub fn spawn_event_logger(event_bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::ResponseGenerated {
            conversation_id,
            model,
            tokens_used,
            ..
        } => info!(conversation_id, model, tokens_used, "Response generated"),
        DomainEvent::ToolExecuted {
            tool_name,
            success,
            duration_ms,
            ..
        } => info!(tool = tool_name, success, duration_ms, "Tool executed"),
        DomainEvent::ClientToolsRequested {
            conversation_id,
            tool_names,
            ..
        } => debug!(conversation_id, tools = ?tool_names, "Client tools requested"),
        DomainEvent::ErrorOccurred {
            context, error_message, ..
        } => warn!(context, error = error_message, "Copilot error"),
    }
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let services = Services::from_config(&config)?;
    let _logger = spawn_event_logger(&services.event_bus);
    let app = build_router(&services, &config.gateway);

    info!(
        addr = %addr,
        model = %config.default_model,
        store = services.store.backend_name(),
        tools = services.tools.len(),
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    store_configured: bool,
    store_backend: String,
    tools: usize,
}

async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        store_configured: state.store_configured,
        store_backend: state.store_backend.clone(),
        tools: state.tool_count,
    })
}

//! Chat node, routing and tool node.

use chrono::Utc;
use scopepilot_config::AppConfig;
use scopepilot_core::event::{DomainEvent, EventBus};
use scopepilot_core::message::{Conversation, Message, MessageToolCall};
use scopepilot_core::provider::{Provider, ProviderRequest, ToolDefinition};
use scopepilot_core::tool::{ToolCall, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::prompt::build_system_prompt;

const ITERATION_LIMIT_REPLY: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// What one conversation turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Text of the final assistant message
    pub reply: String,

    /// Client tool calls the frontend must execute before the next turn
    pub pending_client_calls: Vec<MessageToolCall>,

    /// Tool-node passes taken this turn
    pub tool_iterations: u32,
}

/// The chat ↔ tool loop behind every copilot turn.
pub struct CopilotGraph {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    max_iterations: u32,
    platform_name: String,
    event_bus: Arc<EventBus>,
}

impl CopilotGraph {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            max_iterations: 25,
            platform_name: "VBT estimation and contracts platform".into(),
            event_bus,
        }
    }

    /// A graph using the model, sampling and loop settings from `config`.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(provider, &config.default_model, tools, event_bus)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_max_iterations(config.max_tool_iterations)
            .with_platform_name(&config.drafting.platform_name)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_platform_name(mut self, name: impl Into<String>) -> Self {
        self.platform_name = name.into();
        self
    }

    /// Backend definitions first, then client definitions whose names do
    /// not shadow a backend tool.
    fn bound_tools(&self, client_tools: &[ToolDefinition]) -> Vec<ToolDefinition> {
        let mut bound = self.tools.definitions();
        for tool in client_tools {
            if self.tools.contains(&tool.name) || bound.iter().any(|t| t.name == tool.name) {
                debug!(tool = %tool.name, "Skipping duplicate client tool definition");
                continue;
            }
            bound.push(tool.clone());
        }
        bound
    }

    /// Go to the tool node only when a call names a backend tool.
    fn routes_to_tool_node(&self, message: &Message) -> bool {
        message.tool_calls.iter().any(|tc| self.tools.contains(&tc.name))
    }

    /// Run one turn: loop chat → tool until the model stops asking for
    /// backend tools. New messages are appended to `conversation`; the
    /// system prompt is rebuilt per call and never stored.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        client_tools: &[ToolDefinition],
    ) -> Result<TurnOutcome, scopepilot_core::Error> {
        info!(
            conversation_id = %conversation.id,
            workflow = ?conversation.context.workflow,
            entity_id = ?conversation.context.entity_id(),
            messages = conversation.messages.len(),
            "Processing copilot turn"
        );

        let system_prompt = build_system_prompt(&conversation.context, &self.platform_name);
        let tool_definitions = self.bound_tools(client_tools);
        let mut tool_iterations = 0;

        loop {
            // chat node
            let mut messages = Vec::with_capacity(conversation.messages.len() + 1);
            messages.push(Message::system(&system_prompt));
            messages.extend(conversation.messages.iter().cloned());

            let request = ProviderRequest {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
                parallel_tool_calls: Some(false),
                stop: vec![],
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: "chat_node".into(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(e.into());
                }
            };

            let tokens_used = response.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0);
            let message = response.message;

            if !self.routes_to_tool_node(&message) {
                let reply = message.content.clone();
                let pending_client_calls = message.tool_calls.clone();
                conversation.push(message);

                if pending_client_calls.is_empty() {
                    self.event_bus.publish(DomainEvent::ResponseGenerated {
                        conversation_id: conversation.id.to_string(),
                        model: response.model,
                        tokens_used,
                        timestamp: Utc::now(),
                    });
                } else {
                    let tool_names: Vec<String> = pending_client_calls.iter().map(|tc| tc.name.clone()).collect();
                    debug!(tools = ?tool_names, "Ending turn on client tool calls");
                    self.event_bus.publish(DomainEvent::ClientToolsRequested {
                        conversation_id: conversation.id.to_string(),
                        tool_names,
                        timestamp: Utc::now(),
                    });
                }

                return Ok(TurnOutcome {
                    reply,
                    pending_client_calls,
                    tool_iterations,
                });
            }

            if tool_iterations >= self.max_iterations {
                warn!(
                    conversation_id = %conversation.id,
                    iterations = tool_iterations,
                    "Max tool iterations reached, ending turn"
                );
                // Leave the unanswered tool calls out of the thread
                conversation.push(Message::assistant(ITERATION_LIMIT_REPLY));
                return Ok(TurnOutcome {
                    reply: ITERATION_LIMIT_REPLY.into(),
                    pending_client_calls: Vec::new(),
                    tool_iterations,
                });
            }

            // tool node
            tool_iterations += 1;
            let tool_calls = message.tool_calls.clone();
            conversation.push(message);
            for tc in &tool_calls {
                let output = self.execute_call(tc).await;
                conversation.push(Message::tool_result(&tc.id, output));
            }
        }
    }

    /// Run one call, always producing text for the tool result message.
    async fn execute_call(&self, tc: &MessageToolCall) -> String {
        if !self.tools.contains(&tc.name) {
            warn!(tool = %tc.name, "Client tool requested alongside backend tools");
            return format!(
                "Error: {} is not a valid tool, try one of [{}].",
                tc.name,
                self.tools.names().join(", ")
            );
        }

        let arguments = if tc.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(&tc.arguments) {
                Ok(arguments) => arguments,
                Err(e) => return format!("Error: invalid arguments for {}: {e}", tc.name),
            }
        };
        let call = ToolCall {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments,
        };

        let start = std::time::Instant::now();
        let result = self.tools.execute(&call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(tool_result) => {
                debug!(tool = %tc.name, success = tool_result.success, duration_ms, "Tool executed");
                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: tc.name.clone(),
                    success: tool_result.success,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                tool_result.output
            }
            Err(e) => {
                warn!(tool = %tc.name, error = %e, "Tool execution failed");
                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: tc.name.clone(),
                    success: false,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                // Report to the model so it can recover
                format!("Error: {e}")
            }
        }
    }
}

//! Tool trait: the abstraction over copilot capabilities.
//!
//! Tools are what let the copilot act on estimates and agreements: summarize
//! artifacts, generate a WBS, price a quote, draft and redline contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    pub name: String,

    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
///
/// Business-rule failures ("no WBS rows", "credentials missing") are results
/// with `success = false` and `data = {"error": ...}`, not `ToolError`s: they
/// go back to the model as ordinary tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    pub success: bool,

    /// Text handed back to the model
    pub output: String,

    /// Structured payload for programmatic callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful result whose output is the pretty-printed value.
    pub fn json(value: serde_json::Value) -> Self {
        let output = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self {
            call_id: String::new(),
            success: true,
            output,
            data: Some(value),
        }
    }

    /// A successful markdown/text result with an optional structured payload.
    pub fn text(output: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
            data,
        }
    }

    /// A structured failure: `{"error": message}`.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            call_id: String::new(),
            success: false,
            data: Some(serde_json::json!({ "error": message })),
            output: message,
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    /// The `error` field of a structured failure.
    pub fn error_message(&self) -> Option<&str> {
        self.data.as_ref()?.get("error")?.as_str()
    }
}

/// The core Tool trait.
///
/// Each copilot capability implements this trait and is registered in the
/// [`ToolRegistry`] the tool node executes from.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "generate_wbs").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The backend tools the copilot can execute server-side.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool definitions, sorted by name so prompts are stable.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call, stamping the result with the call id.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = self.tools.get(&call.name).ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let result = tool.execute(call.arguments.clone()).await?;
        Ok(result.with_call_id(&call.id))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull a required, non-blank string argument.
pub fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> std::result::Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' parameter")))
}

/// Pull an optional string argument, treating blanks as absent.
pub fn optional_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    arguments[key].as_str().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError> {
            let text = required_str(&arguments, "text")?;
            Ok(ToolResult::text(text, None))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.contains("echo"));
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn registry_execute_stamps_call_id() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "hello world"}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello world");
        assert_eq!(result.call_id, "call_1");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn blank_required_argument_is_invalid() {
        let err = EchoTool.execute(serde_json::json!({"text": "   "})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn failure_carries_error_field() {
        let result = ToolResult::failure("Supabase credentials missing");
        assert!(!result.success);
        assert_eq!(result.error_message(), Some("Supabase credentials missing"));
        assert_eq!(result.output, "Supabase credentials missing");
    }

    #[test]
    fn json_result_pretty_prints() {
        let result = ToolResult::json(serde_json::json!({"count": 2}));
        assert!(result.output.contains("\"count\": 2"));
        assert!(result.error_message().is_none());
    }
}

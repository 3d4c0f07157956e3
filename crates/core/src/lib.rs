//! # ScopePilot Core
//!
//! Domain types, traits, and error definitions for the ScopePilot copilot.
//! This crate has **no transport dependencies**: it defines the domain model
//! (estimates, agreements, versions) and the seams every other crate
//! implements against.
//!
//! ## Seams
//!
//! - [`Provider`]: the chat-completion backend the copilot graph talks to.
//! - [`Tool`]: a capability the agent may invoke, collected in a [`ToolRegistry`].
//! - [`RestBackend`]: the row store all durable state lives in.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod store;
pub mod domain;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, ProviderError, StoreError, ToolError};
pub use message::{Message, Role, Conversation, ConversationId, MessageToolCall};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{Tool, ToolCall, ToolResult, ToolRegistry};
pub use store::{RestBackend, RowQuery, Filter, Order, Returning, Row};
pub use agent::{WorkflowContext, Workflow};
pub use event::{DomainEvent, EventBus};

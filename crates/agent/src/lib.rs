//! The copilot graph: a chat node and a tool node joined in a loop.
//!
//! 1. **Chat node**: prepend a workflow-aware system prompt, bind backend
//!    and client tool definitions, ask the provider for one assistant turn
//!    with parallel tool calls disabled.
//! 2. **Route**: if any requested call names a backend tool, go to the
//!    tool node; otherwise end the turn and hand client tool calls back to
//!    the caller as pending.
//! 3. **Tool node**: run the calls one at a time, append the results, go
//!    back to the chat node.
//!
//! The loop stops on a reply without backend calls or when
//! `max_tool_iterations` is reached.

pub mod graph;
pub mod prompt;

pub use graph::{CopilotGraph, TurnOutcome};
pub use prompt::build_system_prompt;

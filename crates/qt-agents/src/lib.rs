//! The four agents, the tools they call and the workflows that sequence them.
//!
//! Agents are LLM-backed: each phase sends a role prompt to an
//! [`qt_intelligence::LlmProvider`], executes the tool calls the model asks
//! for against [`qt_core::Memory`] and feeds the results back until the phase
//! ends.

pub mod agent;
pub mod report;
pub mod roles;
pub mod tools;
pub mod workflow;

pub use agent::{AgentError, AgentRunner, PhaseOutcome, PhaseSpec, StopReason};
pub use roles::RoleConfig;
pub use tools::{execute_tool, ToolCallRequest, ToolCallResult, ToolDefinition};
pub use workflow::{Workflow, WorkflowReport};

//! One agent phase: prompt the model, run the tool calls it asks for, feed
//! the results back, repeat until the phase ends.

use qt_core::types::AgentRole;
use qt_core::{Memory, ProjectHandle, StoreError};
use qt_intelligence::{LlmConfig, LlmMessage, LlmProvider, LlmUsageTracker};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::roles::RoleConfig;
use crate::tools::{describe_tools, execute_tool, ToolCallRequest, ToolCallResult};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Only store failures stop a workflow. LLM failures end the phase they
/// occur in and are reported as text.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("memory store error: {0}")]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Phase description and outcome
// ---------------------------------------------------------------------------

/// What one agent is asked to do in one phase.
#[derive(Debug, Clone)]
pub struct PhaseSpec {
    pub role: AgentRole,
    /// Display name, e.g. `EXECUTION (CYCLE 2)`.
    pub name: String,
    pub instruction: String,
    /// Maximum model replies in this phase.
    pub message_limit: usize,
    /// Extra marker that ends the phase, matched case-sensitively.
    pub marker: Option<&'static str>,
}

impl PhaseSpec {
    pub fn new(
        role: AgentRole,
        name: impl Into<String>,
        instruction: impl Into<String>,
        message_limit: usize,
    ) -> Self {
        Self {
            role,
            name: name.into(),
            instruction: instruction.into(),
            message_limit,
            marker: None,
        }
    }

    pub fn with_marker(mut self, marker: &'static str) -> Self {
        self.marker = Some(marker);
        self
    }

    /// `complete!` in any case, or this phase's own marker.
    fn is_finished(&self, reply: &str) -> bool {
        reply.to_lowercase().contains("complete!")
            || self.marker.is_some_and(|m| reply.contains(m))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The agent said it was done.
    Marker,
    /// A reply with no tool calls.
    NoToolCall,
    /// `message_limit` replies were used up.
    Budget,
    /// The provider failed; see [`PhaseOutcome::error`].
    LlmError,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseOutcome {
    pub role: AgentRole,
    pub phase: String,
    /// Last reply text with tool-call lines removed. Recorded as the phase's
    /// conversation.
    pub final_message: String,
    pub replies: usize,
    pub tool_calls: usize,
    /// Calls refused because the role may not use the tool, or the tool is
    /// unknown.
    pub rejected_calls: usize,
    pub stop: StopReason,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Tool-call protocol
// ---------------------------------------------------------------------------

const TOOL_PROTOCOL: &str = "\
To call a tool, put one JSON object on its own line:
{\"tool\": \"<tool name>\", \"arguments\": {...}}
You may call several tools in one reply, one per line. Tool results arrive in the next message. \
Reply without any tool call when you have nothing left to do.";

/// Full system prompt for `role`: its instructions, then its tools.
pub fn system_prompt(role: AgentRole) -> String {
    format!(
        "{}\n\n{}\n\nYour tools:\n{}",
        role.system_prompt(),
        TOOL_PROTOCOL,
        describe_tools(role.allowed_tools())
    )
}

/// Extract tool calls from a model reply.
///
/// A call is any line that parses as a JSON object with a string `tool`
/// field. `arguments` defaults to an empty object.
pub fn parse_tool_calls(reply: &str) -> Vec<ToolCallRequest> {
    reply.lines().filter_map(parse_tool_call).collect()
}

fn parse_tool_call(line: &str) -> Option<ToolCallRequest> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let val = serde_json::from_str::<serde_json::Value>(trimmed).ok()?;
    let name = val.get("tool").and_then(|v| v.as_str())?;
    let arguments = val
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    Some(ToolCallRequest::new(name, arguments))
}

/// Reply text without tool-call lines or code fences.
fn visible_text(reply: &str) -> String {
    reply
        .lines()
        .filter(|l| parse_tool_call(l).is_none() && !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Phase loop
// ---------------------------------------------------------------------------

/// Drives one phase for one role.
pub struct AgentRunner<'a> {
    provider: &'a dyn LlmProvider,
    config: LlmConfig,
}

impl<'a> AgentRunner<'a> {
    pub fn new(provider: &'a dyn LlmProvider, config: LlmConfig) -> Self {
        Self { provider, config }
    }

    /// Run `phase` against `project`, then record the final message as a
    /// conversation.
    pub async fn run_phase(
        &self,
        memory: &mut Memory,
        project: &ProjectHandle,
        phase: &PhaseSpec,
        usage: &mut LlmUsageTracker,
    ) -> Result<PhaseOutcome, AgentError> {
        let role = phase.role;
        let config = self.config.clone().with_system_prompt(system_prompt(role));
        let mut messages = vec![LlmMessage::user(phase.instruction.clone())];
        let mut outcome = PhaseOutcome {
            role,
            phase: phase.name.clone(),
            final_message: String::new(),
            replies: 0,
            tool_calls: 0,
            rejected_calls: 0,
            stop: StopReason::Budget,
            error: None,
        };

        info!(agent = %role, phase = %phase.name, limit = phase.message_limit, "phase started");

        while outcome.replies < phase.message_limit {
            let reply = match self.provider.complete(&messages, &config).await {
                Ok(resp) => {
                    usage.record(&resp);
                    resp.content
                }
                Err(e) => {
                    usage.record_failure();
                    warn!(agent = %role, phase = %phase.name, error = %e, "LLM request failed");
                    outcome.final_message = format!("LLM request failed: {e}");
                    outcome.error = Some(e.to_string());
                    outcome.stop = StopReason::LlmError;
                    break;
                }
            };
            outcome.replies += 1;

            let text = visible_text(&reply);
            if !text.is_empty() {
                outcome.final_message = text;
            }
            let calls = parse_tool_calls(&reply);
            let finished = phase.is_finished(&reply);
            messages.push(LlmMessage::assistant(reply));

            if calls.is_empty() {
                outcome.stop = if finished {
                    StopReason::Marker
                } else {
                    StopReason::NoToolCall
                };
                break;
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let result = self.dispatch(memory, project, role, call);
                if result.is_error {
                    debug!(agent = %role, tool = %call.name, result = %result, "tool call failed");
                }
                if result.content.starts_with(REFUSED_PREFIX) {
                    outcome.rejected_calls += 1;
                }
                outcome.tool_calls += 1;
                results.push(format!("[{}] {}", call.name, result.content));
            }

            if finished {
                outcome.stop = StopReason::Marker;
                break;
            }
            messages.push(LlmMessage::user(results.join("\n\n")));
        }

        memory.add_conversation(project, role, outcome.final_message.clone())?;
        info!(
            agent = %role,
            phase = %phase.name,
            replies = outcome.replies,
            tool_calls = outcome.tool_calls,
            stop = ?outcome.stop,
            "phase finished"
        );
        Ok(outcome)
    }

    fn dispatch(
        &self,
        memory: &mut Memory,
        project: &ProjectHandle,
        role: AgentRole,
        call: &ToolCallRequest,
    ) -> ToolCallResult {
        if !role.allows(&call.name) {
            warn!(agent = %role, tool = %call.name, "tool not allowed for role");
            return ToolCallResult::error(format!(
                "{REFUSED_PREFIX} {} is not available to the {role}",
                call.name
            ));
        }
        execute_tool(memory, project, call).unwrap_or_else(|| {
            ToolCallResult::error(format!("{REFUSED_PREFIX} unknown tool {}", call.name))
        })
    }
}

const REFUSED_PREFIX: &str = "Refused:";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use qt_core::types::{TaskStatus, WorkflowType};
    use qt_intelligence::{LlmError, MockProvider};

    fn setup() -> (Memory, ProjectHandle) {
        let mut memory = Memory::in_memory();
        let project = memory
            .start_project("build a project management framework", WorkflowType::CompletePipeline)
            .unwrap();
        (memory, project)
    }

    #[test]
    fn parses_tool_lines_only() {
        let reply = "Let me plan.\n\
            {\"tool\": \"create_task_tool\", \"arguments\": {\"description\": \"Draft\"}}\n\
            {\"not_a_tool\": 1}\n\
            {\"tool\": \"get_stats_tool\"}\n\
            { broken json";
        let calls = parse_tool_calls(reply);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "create_task_tool");
        assert_eq!(calls[0].arguments["description"], "Draft");
        assert_eq!(calls[1].arguments, serde_json::json!({}));
    }

    #[test]
    fn visible_text_drops_calls_and_fences() {
        let reply = "Working\n```json\n{\"tool\": \"get_stats_tool\"}\n```\nPlanning complete!";
        assert_eq!(visible_text(reply), "Working\nPlanning complete!");
    }

    #[test]
    fn marker_matching() {
        let phase = PhaseSpec::new(AgentRole::Summariser, "SUMMARY", "go", 5)
            .with_marker("Summary complete");
        assert!(phase.is_finished("Summary complete."));
        assert!(phase.is_finished("all EXECUTION COMPLETE!"));
        assert!(!phase.is_finished("summary complete"));
        assert!(!phase.is_finished("completed the work"));
    }

    #[test]
    fn system_prompt_lists_only_role_tools() {
        let prompt = system_prompt(AgentRole::Critic);
        assert!(prompt.contains("review_task_tool"));
        assert!(prompt.contains("get_completed_tasks_tool"));
        assert!(!prompt.contains("- create_task_tool"));
    }

    #[tokio::test]
    async fn planner_phase_creates_tasks_and_records_conversation() {
        let (mut memory, project) = setup();
        let provider = MockProvider::new()
            .with_text(concat!(
                r#"{"tool": "create_task_tool", "arguments": {"description": "Define roles"}}"#,
                "\n",
                r#"{"tool": "create_task_tool", "arguments": {"description": "Pick tooling"}}"#,
            ))
            .with_text("Two tasks created. Planning complete!");
        let runner = AgentRunner::new(&provider, LlmConfig::default());
        let phase = PhaseSpec::new(AgentRole::Planner, "STRATEGIC PLANNING", "plan it", 6);
        let mut usage = LlmUsageTracker::new();

        let outcome = runner.run_phase(&mut memory, &project, &phase, &mut usage).await.unwrap();

        assert_eq!(outcome.stop, StopReason::Marker);
        assert_eq!(outcome.replies, 2);
        assert_eq!(outcome.tool_calls, 2);
        assert_eq!(memory.pending_tasks(&project).len(), 2);
        assert_eq!(usage.total_requests, 2);

        let conv = &memory.data().conversations[0];
        assert_eq!(conv.agent, "Planner");
        assert_eq!(conv.message, "Two tasks created. Planning complete!");

        // Tool results are fed back as the next user turn.
        let captured = provider.captured_requests();
        let second = &captured[1].0;
        assert!(second.last().unwrap().content.contains("Created task: task_"));
        assert!(captured[0].1.system_prompt.as_deref().unwrap().contains("create_task_tool"));
    }

    #[tokio::test]
    async fn disallowed_tool_is_refused() {
        let (mut memory, project) = setup();
        memory.add_task(&project, "t1", "a").unwrap();
        let call = r#"{"tool": "complete_task_tool", "arguments": {"task_id": "t1"}}"#;
        let provider = MockProvider::new()
            .with_text(call)
            .with_text("Nothing else to do.");
        let runner = AgentRunner::new(&provider, LlmConfig::default());
        let phase = PhaseSpec::new(AgentRole::Planner, "PLANNING", "plan", 6);

        let outcome = runner
            .run_phase(&mut memory, &project, &phase, &mut LlmUsageTracker::new())
            .await
            .unwrap();

        assert_eq!(outcome.rejected_calls, 1);
        assert_eq!(outcome.stop, StopReason::NoToolCall);
        assert_eq!(memory.task("t1").unwrap().status, TaskStatus::Pending);
        let fed_back = &provider.captured_requests()[1].0;
        assert!(fed_back.last().unwrap().content.contains("is not available to the Planner"));
    }

    #[tokio::test]
    async fn budget_stops_a_chatty_agent() {
        let (mut memory, project) = setup();
        let mut provider = MockProvider::new();
        for _ in 0..10 {
            provider = provider.with_text("{\"tool\": \"get_stats_tool\"}");
        }
        let runner = AgentRunner::new(&provider, LlmConfig::default());
        let phase = PhaseSpec::new(AgentRole::Executor, "EXECUTION", "run", 3);

        let outcome = runner
            .run_phase(&mut memory, &project, &phase, &mut LlmUsageTracker::new())
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Budget);
        assert_eq!(outcome.replies, 3);
        assert_eq!(provider.remaining(), 7);
        assert_eq!(memory.data().conversations[0].message, "");
    }

    #[tokio::test]
    async fn llm_failure_ends_phase_as_text() {
        let (mut memory, project) = setup();
        let provider = MockProvider::new().with_error(LlmError::RateLimited {
            retry_after_secs: Some(30),
        });
        let runner = AgentRunner::new(&provider, LlmConfig::default());
        let phase = PhaseSpec::new(AgentRole::Critic, "REVIEW", "review", 6);
        let mut usage = LlmUsageTracker::new();

        let outcome = runner.run_phase(&mut memory, &project, &phase, &mut usage).await.unwrap();

        assert_eq!(outcome.stop, StopReason::LlmError);
        assert!(outcome.final_message.starts_with("LLM request failed: rate limited"));
        assert_eq!(usage.failed_requests, 1);
        assert_eq!(provider.captured_requests().len(), 1);
        assert_eq!(memory.data().conversations[0].agent, "Critic");
    }
}

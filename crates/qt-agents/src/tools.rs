use std::collections::BTreeMap;

use qt_core::stats::SystemStats;
use qt_core::types::TaskStatus;
use qt_core::{Memory, ProjectHandle, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

// ---------------------------------------------------------------------------
// Tool façade
//
// Ten tools adapt text-based tool calls to store operations. Every outcome,
// including store failures, comes back as human-readable text; nothing is
// propagated to the agent loop as an error.
// ---------------------------------------------------------------------------

pub mod names {
    pub const CREATE_TASK: &str = "create_task_tool";
    pub const GET_PENDING_TASKS: &str = "get_pending_tasks_tool";
    pub const COMPLETE_TASK: &str = "complete_task_tool";
    pub const GET_COMPLETED_TASKS: &str = "get_completed_tasks_tool";
    pub const REVIEW_TASK: &str = "review_task_tool";
    pub const GET_REVIEWED_TASKS: &str = "get_reviewed_tasks_tool";
    pub const CREATE_SUMMARY: &str = "create_summary_tool";
    pub const GENERATE_INSIGHT: &str = "generate_insight_tool";
    pub const GET_PROJECT_OVERVIEW: &str = "get_project_overview_tool";
    pub const GET_STATS: &str = "get_stats_tool";
}

/// Completed-task results longer than this are cut in listings.
const RESULT_PREVIEW_CHARS: usize = 100;

/// A tool as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A tool invocation requested by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

impl std::fmt::Display for ToolCallResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content)
    }
}

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

/// Return the complete list of tool definitions.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        def(
            names::CREATE_TASK,
            "Create one specific, actionable task for the current project.",
            json!({
                "type": "object",
                "properties": {
                    "description": {"type": "string", "description": "What the task must deliver"}
                },
                "required": ["description"]
            }),
        ),
        def(
            names::GET_PENDING_TASKS,
            "List the project's tasks that are waiting to be executed.",
            json!({"type": "object", "properties": {}}),
        ),
        def(
            names::COMPLETE_TASK,
            "Mark a pending task as completed and attach its full result.",
            json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "string", "description": "Exact id of a pending task"},
                    "result": {"type": "string", "description": "The complete deliverable"}
                },
                "required": ["task_id", "result"]
            }),
        ),
        def(
            names::GET_COMPLETED_TASKS,
            "List completed tasks that are ready for review.",
            json!({"type": "object", "properties": {}}),
        ),
        def(
            names::REVIEW_TASK,
            "Score a completed task from 0 to 100 and give feedback.",
            json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "string", "description": "Exact id of a completed task"},
                    "score": {"type": "integer", "minimum": 0, "maximum": 100},
                    "feedback": {"type": "string", "description": "Specific, actionable feedback"}
                },
                "required": ["task_id", "score", "feedback"]
            }),
        ),
        def(
            names::GET_REVIEWED_TASKS,
            "List reviewed tasks with their scores and feedback.",
            json!({"type": "object", "properties": {}}),
        ),
        def(
            names::CREATE_SUMMARY,
            "Record a project summary. Insights may be a numbered list, bullets or one per line.",
            json!({
                "type": "object",
                "properties": {
                    "summary_type": {
                        "type": "string",
                        "enum": ["executive", "technical", "quality"]
                    },
                    "content": {"type": "string"},
                    "insights": {"type": "string"}
                },
                "required": ["summary_type", "content"]
            }),
        ),
        def(
            names::GENERATE_INSIGHT,
            "Record a strategic insight about the system or process.",
            json!({
                "type": "object",
                "properties": {
                    "insight": {"type": "string"},
                    "category": {"type": "string", "description": "Defaults to \"general\""}
                },
                "required": ["insight"]
            }),
        ),
        def(
            names::GET_PROJECT_OVERVIEW,
            "Show the current project's goal, status and task progress.",
            json!({"type": "object", "properties": {}}),
        ),
        def(
            names::GET_STATS,
            "Show system-wide statistics across all projects and agents.",
            json!({"type": "object", "properties": {}}),
        ),
    ]
}

fn def(name: &str, description: &str, input_schema: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Execute a tool call against `memory` for `project`.
///
/// Returns `None` if the tool name is unknown.
pub fn execute_tool(
    memory: &mut Memory,
    project: &ProjectHandle,
    request: &ToolCallRequest,
) -> Option<ToolCallResult> {
    let args = &request.arguments;
    let result = match request.name.as_str() {
        names::CREATE_TASK => Some(
            arg_str(args, "description").map(|d| create_task_tool(memory, project, d)),
        ),
        names::GET_PENDING_TASKS => Some(Ok(get_pending_tasks_tool(memory, project))),
        names::COMPLETE_TASK => Some(exec_complete_task(memory, args)),
        names::GET_COMPLETED_TASKS => Some(Ok(get_completed_tasks_tool(memory, project))),
        names::REVIEW_TASK => Some(exec_review_task(memory, args)),
        names::GET_REVIEWED_TASKS => Some(Ok(get_reviewed_tasks_tool(memory, project))),
        names::CREATE_SUMMARY => Some(exec_create_summary(memory, project, args)),
        names::GENERATE_INSIGHT => Some(arg_str(args, "insight").map(|insight| {
            let category = opt_str(args, "category").unwrap_or("general");
            generate_insight_tool(memory, project, insight, category)
        })),
        names::GET_PROJECT_OVERVIEW => Some(Ok(get_project_overview_tool(memory, project))),
        names::GET_STATS => Some(Ok(get_stats_tool(memory))),
        _ => None,
    };

    result.map(|r| {
        let r = r.unwrap_or_else(|e| e);
        info!(
            tool = %request.name,
            project_id = %project,
            is_error = r.is_error,
            "executed tool"
        );
        r
    })
}

type ArgResult = Result<ToolCallResult, ToolCallResult>;

fn exec_complete_task(memory: &mut Memory, args: &serde_json::Value) -> ArgResult {
    let task_id = arg_str(args, "task_id")?;
    let result = arg_str(args, "result")?;
    Ok(complete_task_tool(memory, task_id, result))
}

fn exec_review_task(memory: &mut Memory, args: &serde_json::Value) -> ArgResult {
    let task_id = arg_str(args, "task_id")?;
    let score = arg_i64(args, "score")?;
    let feedback = arg_str(args, "feedback")?;
    Ok(review_task_tool(memory, task_id, score, feedback))
}

fn exec_create_summary(
    memory: &mut Memory,
    project: &ProjectHandle,
    args: &serde_json::Value,
) -> ArgResult {
    let summary_type = arg_str(args, "summary_type")?;
    let content = arg_str(args, "content")?;
    let insights = opt_str(args, "insights").unwrap_or_default();
    Ok(create_summary_tool(memory, project, summary_type, content, insights))
}

fn arg_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolCallResult> {
    match args.get(key) {
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(_) => Err(ToolCallResult::error(format!("parameter {key} must be a string"))),
        None => Err(ToolCallResult::error(format!("missing required parameter: {key}"))),
    }
}

fn opt_str<'a>(args: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Integer argument; numeric strings and whole floats are accepted because
/// models emit both.
fn arg_i64(args: &serde_json::Value, key: &str) -> Result<i64, ToolCallResult> {
    let value = args
        .get(key)
        .ok_or_else(|| ToolCallResult::error(format!("missing required parameter: {key}")))?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| ToolCallResult::error(format!("parameter {key} must be an integer")))
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// New task id: `task_<unix seconds>_<6 hex>`.
pub fn new_task_id() -> String {
    let suffix = uuid::Uuid::new_v4().as_simple().to_string();
    format!("task_{}_{}", chrono::Utc::now().timestamp(), &suffix[..6])
}

pub fn create_task_tool(
    memory: &mut Memory,
    project: &ProjectHandle,
    description: &str,
) -> ToolCallResult {
    let task_id = new_task_id();
    match memory.add_task(project, &task_id, description) {
        Ok(task) => {
            ToolCallResult::text(format!("Created task: {}\n{}", task.id, task.description))
        }
        Err(e) => ToolCallResult::error(format!("Failed to create task: {e}")),
    }
}

pub fn get_pending_tasks_tool(memory: &Memory, project: &ProjectHandle) -> ToolCallResult {
    let tasks = memory.pending_tasks(project);
    if tasks.is_empty() {
        return ToolCallResult::text("No pending tasks found.");
    }
    let mut out = String::from("Pending Tasks:\n");
    for (i, task) in tasks.iter().enumerate() {
        out.push_str(&format!("{}. ID: {}\n   {}\n", i + 1, task.id, task.description));
    }
    ToolCallResult::text(out)
}

pub fn complete_task_tool(memory: &mut Memory, task_id: &str, result: &str) -> ToolCallResult {
    match memory.complete_task(task_id, result) {
        Ok(_) => ToolCallResult::text(format!("Completed task: {task_id}")),
        Err(StoreError::NotFound { .. } | StoreError::InvalidTransition { .. }) => {
            ToolCallResult::error(format!(
                "Failed to complete task: {task_id} (not found or not pending)"
            ))
        }
        Err(e) => ToolCallResult::error(format!("Failed to complete task: {task_id} ({e})")),
    }
}

pub fn get_completed_tasks_tool(memory: &Memory, project: &ProjectHandle) -> ToolCallResult {
    let tasks = memory.completed_tasks(project);
    if tasks.is_empty() {
        return ToolCallResult::text("No completed tasks found for review.");
    }
    let mut out = String::from("Completed Tasks Ready for Review:\n");
    for (i, task) in tasks.iter().enumerate() {
        out.push_str(&format!(
            "{}. ID: {}\n   Description: {}\n   Result: {}\n",
            i + 1,
            task.id,
            task.description,
            preview(task.result.as_deref().unwrap_or_default(), RESULT_PREVIEW_CHARS),
        ));
    }
    ToolCallResult::text(out)
}

pub fn review_task_tool(
    memory: &mut Memory,
    task_id: &str,
    score: i64,
    feedback: &str,
) -> ToolCallResult {
    match memory.review_task(task_id, score, feedback) {
        Ok(_) => ToolCallResult::text(format!(
            "Reviewed task: {task_id}\nScore: {score}/100\nFeedback: {feedback}"
        )),
        Err(StoreError::InvalidScore(s)) => ToolCallResult::error(format!(
            "Failed to review task: {task_id} (score {s} is outside 0-100)"
        )),
        Err(StoreError::NotFound { .. } | StoreError::InvalidTransition { .. }) => {
            ToolCallResult::error(format!(
                "Failed to review task: {task_id} (not found or not completed)"
            ))
        }
        Err(e) => ToolCallResult::error(format!("Failed to review task: {task_id} ({e})")),
    }
}

pub fn get_reviewed_tasks_tool(memory: &Memory, project: &ProjectHandle) -> ToolCallResult {
    let tasks = memory.reviewed_tasks(project);
    if tasks.is_empty() {
        return ToolCallResult::text("No reviewed tasks found for summarization.");
    }
    let mut out = String::from("Reviewed Tasks Ready for Summarization:\n");
    for (i, task) in tasks.iter().enumerate() {
        out.push_str(&format!(
            "{}. ID: {}\n   Description: {}\n   Score: {}/100\n   Feedback: {}\n",
            i + 1,
            task.id,
            task.description,
            task.review_score.unwrap_or_default(),
            task.review_feedback.as_deref().unwrap_or_default(),
        ));
    }
    ToolCallResult::text(out)
}

pub fn create_summary_tool(
    memory: &mut Memory,
    project: &ProjectHandle,
    summary_type: &str,
    content: &str,
    insights: &str,
) -> ToolCallResult {
    let insights = parse_insights(insights);
    let count = insights.len();
    match memory.add_summary(project, summary_type, content, insights, BTreeMap::new()) {
        Ok(_) => ToolCallResult::text(format!(
            "Created {summary_type} summary with {count} insights"
        )),
        Err(e) => ToolCallResult::error(format!("Failed to create summary: {e}")),
    }
}

pub fn generate_insight_tool(
    memory: &mut Memory,
    project: &ProjectHandle,
    insight: &str,
    category: &str,
) -> ToolCallResult {
    match memory.add_system_insight(project, insight, category) {
        Ok(()) => ToolCallResult::text(format!(
            "Added system insight: {insight} (category: {category})"
        )),
        Err(e) => ToolCallResult::error(format!("Failed to add insight: {e}")),
    }
}

pub fn get_project_overview_tool(memory: &Memory, project: &ProjectHandle) -> ToolCallResult {
    let Some(data) = memory.project_data(project.id()) else {
        return ToolCallResult::error(format!("No project found: {project}"));
    };
    let count = |status: TaskStatus| data.tasks.iter().filter(|t| t.status == status).count();
    let avg = if data.reviews.is_empty() {
        0.0
    } else {
        data.reviews.iter().map(|r| f64::from(r.score)).sum::<f64>() / data.reviews.len() as f64
    };
    let p = &data.project;
    ToolCallResult::text(format!(
        "Project Overview: {}\n\
         ID: {}\n\
         Status: {}\n\
         Workflow: {}\n\
         Started: {}\n\
         \n\
         Progress:\n\
         Tasks: {} total\n\
         - Pending: {}\n\
         - Completed: {}\n\
         - Reviewed: {}\n\
         \n\
         Reviews: {} completed\n\
         Average Score: {:.1}/100\n",
        p.goal,
        p.id,
        p.status,
        p.workflow_type,
        p.start_time.format("%Y-%m-%dT%H:%M:%S"),
        data.tasks.len(),
        count(TaskStatus::Pending),
        count(TaskStatus::Completed),
        count(TaskStatus::Reviewed),
        data.reviews.len(),
        avg,
    ))
}

pub fn get_stats_tool(memory: &Memory) -> ToolCallResult {
    ToolCallResult::text(stats_text(&memory.stats()))
}

fn stats_text(stats: &SystemStats) -> String {
    let a = &stats.agent_stats;
    format!(
        "System Statistics:\n\
         \n\
         Projects:\n\
         - Total: {}\n\
         - Completed: {}\n\
         - Active: {}\n\
         \n\
         Tasks:\n\
         - Total: {}\n\
         - Pending: {}, Completed: {}, Reviewed: {}\n\
         - Average Quality: {:.1}/100\n\
         \n\
         Agent Performance:\n\
         - Planner: {} tasks created, {} projects planned\n\
         - Executor: {} tasks completed\n\
         - Critic: {} reviews (avg: {:.1})\n\
         - Summariser: {} summaries, {} insights\n\
         \n\
         Activity:\n\
         - Conversations: {}\n\
         - Reviews: {}\n\
         - Summaries: {}\n\
         - Insights: {}",
        stats.projects.total,
        stats.projects.completed,
        stats.projects.active,
        stats.tasks.total,
        stats.tasks.pending,
        stats.tasks.completed,
        stats.tasks.reviewed,
        stats.average_score,
        a.planner.tasks_created,
        a.planner.projects_planned,
        a.executor.tasks_completed,
        a.critic.reviews_completed,
        a.critic.average_score,
        a.summariser.summaries_created,
        a.summariser.insights_generated,
        stats.activity.conversations,
        stats.activity.reviews,
        stats.activity.summaries,
        stats.activity.system_insights,
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First `max` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Split free-form insight text into items.
///
/// Numbered items (`1.` to `9.`) win when present, then `•`/`-` bullets,
/// otherwise every non-empty line is an item.
pub fn parse_insights(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let numbered: Vec<String> = lines
        .iter()
        .filter_map(|l| strip_number(l))
        .map(|l| l.trim().to_string())
        .collect();
    if !numbered.is_empty() {
        return numbered;
    }

    let bulleted: Vec<String> = lines
        .iter()
        .filter_map(|l| l.strip_prefix('•').or_else(|| l.strip_prefix('-')))
        .map(|l| l.trim().to_string())
        .collect();
    if !bulleted.is_empty() {
        return bulleted;
    }

    lines.into_iter().map(str::to_string).collect()
}

fn strip_number(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some('1'..='9'), Some('.')) => Some(&line[2..]),
        _ => None,
    }
}

/// Render the tools a role may call, for inclusion in its prompt.
pub fn describe_tools(allowed: &[&str]) -> String {
    tool_definitions()
        .into_iter()
        .filter(|d| allowed.contains(&d.name.as_str()))
        .map(|d| format!("- {}: {}\n  arguments schema: {}", d.name, d.description, d.input_schema))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

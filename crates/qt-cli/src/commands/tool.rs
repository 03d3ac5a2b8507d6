use anyhow::Context as _;
use qt_agents::tools::tool_definitions;
use qt_agents::{execute_tool, ToolCallRequest, ToolCallResult};

use super::Context;

/// Parse `--args`; absent means no arguments.
pub fn parse_args(raw: Option<&str>) -> anyhow::Result<serde_json::Value> {
    let Some(raw) = raw else {
        return Ok(serde_json::json!({}));
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--args must be a JSON object")?;
    if !value.is_object() {
        anyhow::bail!("--args must be a JSON object, got {value}");
    }
    Ok(value)
}

/// Invoke one tool against `project_id` and return its result.
pub fn call(
    ctx: &Context,
    name: &str,
    project_id: &str,
    args: Option<&str>,
) -> anyhow::Result<ToolCallResult> {
    let request = ToolCallRequest::new(name, parse_args(args)?);
    let _lock = ctx.lock("tool")?;
    let mut memory = ctx.open_memory()?;
    let project = memory.handle(project_id)?;

    execute_tool(&mut memory, &project, &request).ok_or_else(|| {
        let known: Vec<String> = tool_definitions().into_iter().map(|d| d.name).collect();
        anyhow::anyhow!("unknown tool {name}. Available: {}", known.join(", "))
    })
}

pub fn run(ctx: &Context, name: &str, project_id: &str, args: Option<&str>) -> anyhow::Result<()> {
    let result = call(ctx, name, project_id, args)?;
    if result.is_error {
        anyhow::bail!("{result}");
    }
    println!("{result}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use qt_core::types::{TaskStatus, WorkflowType};

    fn project(ctx: &Context) -> String {
        let mut memory = ctx.open_memory().unwrap();
        let goal = "create a technical documentation system";
        let h = memory
            .start_project(goal, WorkflowType::CompletePipeline)
            .unwrap();
        h.id().to_string()
    }

    #[test]
    fn args_must_be_an_object() {
        assert_eq!(parse_args(None).unwrap(), serde_json::json!({}));
        assert!(parse_args(Some("[1, 2]")).is_err());
        assert!(parse_args(Some("{oops")).is_err());
        assert_eq!(parse_args(Some(r#"{"score": 90}"#)).unwrap()["score"], 90);
    }

    #[test]
    fn tasks_can_be_driven_by_hand() {
        let (_dir, ctx) = context();
        let pid = project(&ctx);

        let args = r#"{"description": "Write the API guide"}"#;
        let created = call(&ctx, "create_task_tool", &pid, Some(args)).unwrap();
        assert!(!created.is_error);
        let task_id = created
            .content
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("Created task: "))
            .unwrap()
            .to_string();

        let args = format!(r#"{{"task_id": "{task_id}", "result": "Guide written"}}"#);
        assert!(!call(&ctx, "complete_task_tool", &pid, Some(&args)).unwrap().is_error);

        let memory = ctx.open_memory().unwrap();
        assert_eq!(memory.task(&task_id).unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn store_failures_come_back_as_error_results() {
        let (_dir, ctx) = context();
        let pid = project(&ctx);
        let args = r#"{"task_id": "task_nope", "result": "x"}"#;
        let result = call(&ctx, "complete_task_tool", &pid, Some(args)).unwrap();
        assert!(result.is_error);
        assert!(run(&ctx, "complete_task_tool", &pid, Some(args)).is_err());
    }

    #[test]
    fn unknown_tool_and_project_are_errors() {
        let (_dir, ctx) = context();
        let pid = project(&ctx);
        let err = call(&ctx, "weather_tool", &pid, None).unwrap_err();
        assert!(err.to_string().contains("get_stats_tool"));
        assert!(call(&ctx, "get_stats_tool", "project_missing", None).is_err());
    }
}

use qt_agents::report::{render_project, render_workflow_report};
use qt_agents::{Workflow, WorkflowReport};
use qt_core::types::WorkflowType;
use qt_intelligence::{LlmConfig, LlmProvider};
use tracing::info;

use super::Context;

/// Run the `run` subcommand against the configured OpenAI-compatible endpoint.
pub async fn run(ctx: &Context, goal: &str, workflow: WorkflowType) -> anyhow::Result<()> {
    let goal = goal.trim();
    if goal.is_empty() {
        anyhow::bail!("goal must not be empty");
    }
    let provider = ctx.provider()?;
    let report = execute(ctx, &provider, goal, workflow).await?;
    print_report(ctx, &report)
}

/// Lock the memory, run one workflow and return its report.
pub async fn execute(
    ctx: &Context,
    provider: &dyn LlmProvider,
    goal: &str,
    workflow: WorkflowType,
) -> anyhow::Result<WorkflowReport> {
    let _lock = ctx.lock("run")?;
    let mut memory = ctx.open_memory()?;

    info!(goal, workflow = %workflow, memory = %ctx.memory_path().display(), "running workflow");
    let runner = Workflow::new(
        provider,
        LlmConfig::from(&ctx.config.llm),
        ctx.config.workflow.clone(),
    );
    Ok(runner.run(&mut memory, goal, workflow).await?)
}

fn print_report(ctx: &Context, report: &WorkflowReport) -> anyhow::Result<()> {
    println!("{}", render_workflow_report(report));

    let memory = ctx.open_memory()?;
    if let Some(data) = memory.project_data(&report.project_id) {
        println!("{}", render_project(&data));
    }
    let failed = report.failed_phases().count();
    if failed > 0 {
        eprintln!("warning: {failed} phase(s) ended on an LLM error; see above");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use qt_core::types::ProjectStatus;
    use qt_intelligence::MockProvider;

    #[tokio::test]
    async fn missing_key_fails_before_any_project_exists() {
        let (_dir, ctx) = context();
        let err = run(&ctx, "design a customer onboarding process", WorkflowType::Collaborative)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing API key"));
        assert!(!ctx.memory_path().exists());
    }

    #[tokio::test]
    async fn empty_goal_is_rejected() {
        let (_dir, ctx) = context();
        assert!(run(&ctx, "   ", WorkflowType::CompletePipeline).await.is_err());
    }

    #[tokio::test]
    async fn execute_persists_and_releases_the_lock() {
        let (_dir, ctx) = context();
        let provider = MockProvider::new();

        let report = execute(&ctx, &provider, "ship the beta", WorkflowType::CompletePipeline)
            .await
            .unwrap();

        assert_eq!(report.phases.len(), 4);
        assert!(!qt_core::lockfile::WriterLock::path_for(ctx.memory_path()).exists());
        let memory = ctx.open_memory().unwrap();
        let project = memory.project(&report.project_id).unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);
        assert!(print_report(&ctx, &report).is_ok());
    }
}

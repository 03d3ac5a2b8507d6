//! The three fixed agent sequences. Phases always run one after another.

use qt_core::config::WorkflowConfig;
use qt_core::types::{AgentRole, WorkflowType};
use qt_core::{Memory, ProjectHandle};
use qt_intelligence::{LlmConfig, LlmProvider, LlmUsageTracker};
use serde::Serialize;
use tracing::{info, Instrument};

use crate::agent::{AgentError, AgentRunner, PhaseOutcome, PhaseSpec};

/// Result of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub project_id: String,
    pub goal: String,
    pub workflow: WorkflowType,
    pub trace_id: String,
    pub phases: Vec<PhaseOutcome>,
    pub usage: LlmUsageTracker,
}

impl WorkflowReport {
    /// Phases that ended on a provider failure.
    pub fn failed_phases(&self) -> impl Iterator<Item = &PhaseOutcome> {
        self.phases.iter().filter(|p| p.error.is_some())
    }
}

pub struct Workflow<'a> {
    runner: AgentRunner<'a>,
    settings: WorkflowConfig,
}

impl<'a> Workflow<'a> {
    pub fn new(provider: &'a dyn LlmProvider, llm: LlmConfig, settings: WorkflowConfig) -> Self {
        Self {
            runner: AgentRunner::new(provider, llm),
            settings,
        }
    }

    /// Start a project for `goal`, run `kind` to the end and close the
    /// project so its metrics are computed.
    pub async fn run(
        &self,
        memory: &mut Memory,
        goal: &str,
        kind: WorkflowType,
    ) -> Result<WorkflowReport, AgentError> {
        let project = memory.start_project(goal, kind)?;
        let (span, trace_id) = qt_telemetry::spans::workflow_span(project.id(), kind.as_str());

        let mut run = Run {
            runner: &self.runner,
            memory,
            project: &project,
            phases: Vec::new(),
            usage: LlmUsageTracker::new(),
        };

        async {
            info!(goal, "workflow started");
            match kind {
                WorkflowType::CompletePipeline => self.pipeline(&mut run, goal).await?,
                WorkflowType::Collaborative => self.collaborative(&mut run, goal).await?,
                WorkflowType::Iterative => self.iterative(&mut run, goal).await?,
            }
            let summary = closing_summary(kind, self.settings.iterative_cycles);
            let insights = project_insights(run.memory, &project);
            run.memory.end_project(&project, summary, insights)?;
            info!(
                phases = run.phases.len(),
                tokens = run.usage.total_tokens(),
                "workflow finished"
            );
            Ok::<_, AgentError>(())
        }
        .instrument(span)
        .await?;

        Ok(WorkflowReport {
            project_id: project.id().to_string(),
            goal: goal.to_string(),
            workflow: kind,
            trace_id,
            phases: run.phases,
            usage: run.usage,
        })
    }

    async fn pipeline(&self, run: &mut Run<'_, '_>, goal: &str) -> Result<(), AgentError> {
        let limit = self.settings.phase_message_limit;
        run.phase(PhaseSpec::new(
            AgentRole::Planner,
            "STRATEGIC PLANNING",
            format!("Create a comprehensive plan to achieve: {goal}"),
            limit,
        ))
        .await?;
        run.phase(PhaseSpec::new(
            AgentRole::Executor,
            "EXECUTION",
            "Execute all pending tasks with comprehensive, production-ready results",
            limit,
        ))
        .await?;
        run.phase(PhaseSpec::new(
            AgentRole::Critic,
            "QUALITY ASSURANCE",
            "Conduct thorough quality review of all completed tasks \
             with detailed scoring and feedback",
            limit,
        ))
        .await?;
        run.phase(PhaseSpec::new(
            AgentRole::Summariser,
            "SYNTHESIS & REPORTING",
            "Create comprehensive project summary \
             with executive insights and strategic recommendations",
            limit,
        ))
        .await?;
        Ok(())
    }

    async fn collaborative(&self, run: &mut Run<'_, '_>, goal: &str) -> Result<(), AgentError> {
        let budgets = &self.settings.collaborative;
        run.phase(
            PhaseSpec::new(
                AgentRole::Planner,
                "PLANNING",
                format!(
                    "Create 3-5 comprehensive tasks to achieve this goal: {goal}\n\n\
                     Create tasks using create_task_tool and ensure they cover all aspects needed."
                ),
                budgets.planning,
            )
            .with_marker("Planning complete"),
        )
        .await?;
        run.phase(
            PhaseSpec::new(
                AgentRole::Executor,
                "EXECUTION",
                format!(
                    "Execute all pending tasks for goal: {goal}\n\n\
                     Use get_pending_tasks_tool to see tasks and complete_task_tool to execute \
                     each one with comprehensive results."
                ),
                budgets.execution,
            )
            .with_marker("Execution complete"),
        )
        .await?;
        run.phase(
            PhaseSpec::new(
                AgentRole::Critic,
                "REVIEW",
                format!(
                    "Review all completed tasks for goal: {goal}\n\n\
                     Use get_completed_tasks_tool to see completed tasks and review_task_tool to \
                     provide detailed feedback and scores (0-100) for each task."
                ),
                budgets.review,
            )
            .with_marker("Review complete"),
        )
        .await?;
        run.phase(
            PhaseSpec::new(
                AgentRole::Summariser,
                "SUMMARY",
                format!(
                    "Create a comprehensive summary for goal: {goal}\n\n\
                     Use get_reviewed_tasks_tool to see reviewed tasks and create_summary_tool to \
                     generate an executive summary with key insights."
                ),
                budgets.summary,
            )
            .with_marker("Summary complete"),
        )
        .await?;
        Ok(())
    }

    async fn iterative(&self, run: &mut Run<'_, '_>, goal: &str) -> Result<(), AgentError> {
        let limit = self.settings.phase_message_limit;
        let cycles = self.settings.iterative_cycles;

        run.phase(PhaseSpec::new(
            AgentRole::Planner,
            "INITIAL PLANNING",
            format!("Create an initial plan to achieve: {goal}"),
            limit,
        ))
        .await?;

        for cycle in 1..=cycles {
            info!(cycle, cycles, "improvement cycle");
            run.phase(PhaseSpec::new(
                AgentRole::Executor,
                format!("EXECUTION (CYCLE {cycle})"),
                format!("Execute pending tasks for cycle {cycle}"),
                limit,
            ))
            .await?;
            run.phase(PhaseSpec::new(
                AgentRole::Critic,
                format!("REVIEW (CYCLE {cycle})"),
                format!(
                    "Review completed tasks for cycle {cycle} \
                     with detailed feedback for improvements"
                ),
                limit,
            ))
            .await?;
            if cycle < cycles {
                run.phase(PhaseSpec::new(
                    AgentRole::Planner,
                    format!("RE-PLANNING (CYCLE {})", cycle + 1),
                    format!(
                        "Based on the critic's feedback, create improved tasks for cycle {}",
                        cycle + 1
                    ),
                    limit,
                ))
                .await?;
            }
        }

        run.phase(PhaseSpec::new(
            AgentRole::Summariser,
            "FINAL SYNTHESIS",
            "Create comprehensive project summary with insights from all improvement cycles",
            limit,
        ))
        .await?;
        Ok(())
    }
}

/// Mutable state threaded through one run.
struct Run<'r, 'm> {
    runner: &'r AgentRunner<'r>,
    memory: &'m mut Memory,
    project: &'m ProjectHandle,
    phases: Vec<PhaseOutcome>,
    usage: LlmUsageTracker,
}

impl Run<'_, '_> {
    async fn phase(&mut self, spec: PhaseSpec) -> Result<(), AgentError> {
        let span = qt_telemetry::spans::phase_span(spec.role.name(), &spec.name);
        let outcome = self
            .runner
            .run_phase(self.memory, self.project, &spec, &mut self.usage)
            .instrument(span)
            .await?;
        self.phases.push(outcome);
        Ok(())
    }
}

fn closing_summary(kind: WorkflowType, cycles: usize) -> String {
    match kind {
        WorkflowType::CompletePipeline => {
            "Complete four-agent pipeline finished: planning, execution, review and synthesis"
                .to_string()
        }
        WorkflowType::Collaborative => {
            "Structured collaborative workflow completed with all four agents".to_string()
        }
        WorkflowType::Iterative => {
            format!("Iterative improvement workflow completed after {cycles} cycles")
        }
    }
}

/// Every insight the Summariser attached to this project's summaries.
fn project_insights(memory: &Memory, project: &ProjectHandle) -> Vec<String> {
    memory
        .data()
        .summaries
        .iter()
        .filter(|s| s.project_id == project.id())
        .flat_map(|s| s.insights.iter().cloned())
        .collect()
}

//! Plain-text rendering of project results, the dashboard and history.
//!
//! Each report is a borrowed view implementing [`fmt::Display`]; the
//! `render_*` helpers collect one into a `String`.

use std::fmt;

use qt_core::types::Project;
use qt_core::{ProjectData, SystemStats};

use crate::tools::preview;
use crate::workflow::WorkflowReport;

const RULE_WIDTH: usize = 60;
const SUMMARY_PREVIEW_CHARS: usize = 300;
const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

fn rule(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(RULE_WIDTH))
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Tasks, summaries and final metrics of one project.
pub struct ProjectReport<'a>(pub &'a ProjectData);

impl fmt::Display for ProjectReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0;
        let p = &data.project;

        rule(f, &format!("Project {}", p.id))?;
        writeln!(f, "Goal:      {}", p.goal)?;
        writeln!(f, "Workflow:  {}", p.workflow_type)?;
        writeln!(f, "Status:    {}", p.status)?;
        writeln!(f, "Started:   {}", p.start_time.format(TIMESTAMP))?;
        if let Some(end) = p.end_time {
            writeln!(f, "Ended:     {}", end.format(TIMESTAMP))?;
        }

        writeln!(f)?;
        rule(f, &format!("Tasks ({})", data.tasks.len()))?;
        if data.tasks.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for task in &data.tasks {
            let score = task
                .review_score
                .map(|s| format!(" [{s}/100]"))
                .unwrap_or_default();
            writeln!(
                f,
                "  {} {}{}  {}",
                task.status.glyph(),
                task.id,
                score,
                preview(&task.description, 80)
            )?;
        }

        if !data.summaries.is_empty() {
            writeln!(f)?;
            rule(f, &format!("Summaries ({})", data.summaries.len()))?;
            for summary in &data.summaries {
                writeln!(f, "[{}]", summary.summary_type)?;
                writeln!(f, "{}", preview(&summary.content, SUMMARY_PREVIEW_CHARS))?;
                for insight in &summary.insights {
                    writeln!(f, "  * {insight}")?;
                }
                writeln!(f)?;
            }
        }

        let m = &p.metrics;
        writeln!(f)?;
        rule(f, "Metrics")?;
        writeln!(f, "Tasks created:    {}", m.tasks_created)?;
        writeln!(f, "Tasks completed:  {}", m.tasks_completed)?;
        writeln!(f, "Completion rate:  {:.1}%", m.completion_rate)?;
        writeln!(f, "Average score:    {:.1}/100", m.average_score)?;
        writeln!(f, "Reviews:          {}", m.total_reviews)?;

        if let Some(summary) = &p.final_summary {
            writeln!(f)?;
            writeln!(f, "Final summary: {summary}")?;
        }
        Ok(())
    }
}

pub fn render_project(data: &ProjectData) -> String {
    ProjectReport(data).to_string()
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// System-wide counters.
pub struct Dashboard<'a>(pub &'a SystemStats);

impl fmt::Display for Dashboard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.0;
        let a = &stats.agent_stats;

        rule(f, "quartet dashboard")?;
        writeln!(
            f,
            "Projects:       {} total, {} completed, {} active",
            stats.projects.total, stats.projects.completed, stats.projects.active
        )?;
        writeln!(f, "Tasks:          {}", stats.tasks.total)?;
        writeln!(f, "  pending:      {}", stats.tasks.pending)?;
        writeln!(f, "  completed:    {}", stats.tasks.completed)?;
        writeln!(f, "  reviewed:     {}", stats.tasks.reviewed)?;
        writeln!(f, "Average score:  {:.1}/100", stats.average_score)?;
        writeln!(f)?;
        rule(f, "Agents")?;
        writeln!(
            f,
            "Planner:     {} tasks created, {} projects planned",
            a.planner.tasks_created, a.planner.projects_planned
        )?;
        writeln!(f, "Executor:    {} tasks completed", a.executor.tasks_completed)?;
        writeln!(
            f,
            "Critic:      {} reviews, avg {:.1}, {} revisions requested",
            a.critic.reviews_completed, a.critic.average_score, a.critic.revisions_requested
        )?;
        writeln!(
            f,
            "Summariser:  {} summaries, {} insights",
            a.summariser.summaries_created, a.summariser.insights_generated
        )?;
        writeln!(f)?;
        rule(f, "Activity")?;
        writeln!(f, "Conversations:    {}", stats.activity.conversations)?;
        writeln!(f, "Reviews:          {}", stats.activity.reviews)?;
        writeln!(f, "Summaries:        {}", stats.activity.summaries)?;
        writeln!(f, "System insights:  {}", stats.activity.system_insights)
    }
}

pub fn render_dashboard(stats: &SystemStats) -> String {
    Dashboard(stats).to_string()
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One line per project, newest first.
pub struct History<'a>(pub &'a [Project]);

impl fmt::Display for History<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let projects = self.0;
        rule(f, &format!("Project history ({})", projects.len()))?;
        if projects.is_empty() {
            return writeln!(f, "No projects yet.");
        }
        for p in projects.iter().rev() {
            writeln!(
                f,
                "{}  {:<9}  {:<17}  {:>3} tasks  {:>5.1}%  {:>5.1}  {}",
                p.id,
                p.status.to_string(),
                p.workflow_type.to_string(),
                p.metrics.tasks_created,
                p.metrics.completion_rate,
                p.metrics.average_score,
                preview(&p.goal, 50)
            )?;
        }
        Ok(())
    }
}

pub fn render_history(projects: &[Project]) -> String {
    History(projects).to_string()
}

// ---------------------------------------------------------------------------
// Workflow run
// ---------------------------------------------------------------------------

/// Per-phase outcome of a finished run.
pub struct RunReport<'a>(pub &'a WorkflowReport);

impl fmt::Display for RunReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        rule(
            f,
            &format!("{} workflow for project {}", report.workflow, report.project_id),
        )?;
        for phase in &report.phases {
            writeln!(
                f,
                "{:<11} {:<24} replies={} tools={} refused={} stop={:?}",
                phase.role.name(),
                phase.phase,
                phase.replies,
                phase.tool_calls,
                phase.rejected_calls,
                phase.stop
            )?;
            if let Some(err) = &phase.error {
                writeln!(f, "            error: {err}")?;
            }
        }
        writeln!(
            f,
            "LLM usage: {} requests ({} failed), {} tokens",
            report.usage.total_requests,
            report.usage.failed_requests,
            report.usage.total_tokens()
        )
    }
}

pub fn render_workflow_report(report: &WorkflowReport) -> String {
    RunReport(report).to_string()
}

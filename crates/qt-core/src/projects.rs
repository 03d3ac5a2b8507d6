//! Project ledger and the per-project journal (summaries, system insights,
//! agent conversations).

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::store::{Memory, Result, StoreError};
use crate::types::{
    AgentRole, Conversation, Project, ProjectMetrics, ProjectStatus, Review, Summary,
    SystemInsight, Task, WorkflowType,
};

// ---------------------------------------------------------------------------
// ProjectHandle
// ---------------------------------------------------------------------------

/// Names the project an operation applies to.
///
/// Handles are only handed out for projects that exist, either by
/// [`Memory::start_project`] or [`Memory::handle`]. Every project-scoped
/// operation takes one explicitly; there is no implicit "current project".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectHandle {
    id: String,
}

impl ProjectHandle {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for ProjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// A project joined with everything recorded against it.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectData {
    pub project: Project,
    pub tasks: Vec<Task>,
    pub reviews: Vec<Review>,
    pub summaries: Vec<Summary>,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Final metrics over a project's tasks. Empty input yields all zeros.
pub fn compute_metrics<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> ProjectMetrics {
    let mut created = 0usize;
    let mut done = 0usize;
    let mut score_sum = 0u64;
    let mut reviewed = 0usize;

    for task in tasks {
        created += 1;
        if task.status.is_done() {
            done += 1;
        }
        if let Some(score) = task.review_score {
            score_sum += u64::from(score);
            reviewed += 1;
        }
    }

    ProjectMetrics {
        tasks_created: created,
        tasks_completed: done,
        completion_rate: if created == 0 {
            0.0
        } else {
            done as f64 / created as f64 * 100.0
        },
        average_score: if reviewed == 0 {
            0.0
        } else {
            score_sum as f64 / reviewed as f64
        },
        total_reviews: reviewed,
    }
}

// ---------------------------------------------------------------------------
// Ledger operations
// ---------------------------------------------------------------------------

impl Memory {
    /// Create an `active` project and return its handle.
    ///
    /// Other projects that are still active are left as they are.
    pub fn start_project(
        &mut self,
        goal: impl Into<String>,
        workflow: WorkflowType,
    ) -> Result<ProjectHandle> {
        let still_active = self.active_projects().len();
        if still_active > 0 {
            warn!(
                still_active,
                "starting a new project while earlier projects are still active"
            );
        }

        let goal = goal.into();
        let handle = self.mutate(|data| {
            let project = Project::new(goal, workflow, data.projects.len());
            let handle = ProjectHandle {
                id: project.id.clone(),
            };
            data.projects.push(project);
            data.agent_stats.planner.projects_planned += 1;
            handle
        })?;

        info!(project_id = %handle, workflow = %workflow, "project started");
        Ok(handle)
    }

    /// Close `project`: compute final metrics over its tasks, stamp the end
    /// time and mark it `completed`.
    pub fn end_project(
        &mut self,
        project: &ProjectHandle,
        summary: impl Into<String>,
        insights: Vec<String>,
    ) -> Result<&Project> {
        let idx = self.project_index(project.id())?;
        if !self.data().projects[idx].is_active() {
            return Err(StoreError::ProjectNotActive(project.id().to_string()));
        }

        let metrics = compute_metrics(
            self.data()
                .tasks
                .iter()
                .filter(|t| t.project_id == project.id()),
        );

        let summary = summary.into();
        self.mutate(|data| {
            let entry = &mut data.projects[idx];
            entry.end_time = Some(Utc::now());
            entry.status = ProjectStatus::Completed;
            entry.final_summary = Some(summary);
            if !insights.is_empty() {
                entry.insights = Some(insights);
            }
            entry.metrics = metrics;
        })?;

        let entry = &self.data().projects[idx];
        info!(
            project_id = %project,
            tasks = entry.metrics.tasks_created,
            completion_rate = entry.metrics.completion_rate,
            average_score = entry.metrics.average_score,
            "project ended"
        );
        Ok(entry)
    }

    /// Resume a handle for an existing project.
    pub fn handle(&self, project_id: &str) -> Result<ProjectHandle> {
        self.project_index(project_id)?;
        Ok(ProjectHandle {
            id: project_id.to_string(),
        })
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.data().projects.iter().find(|p| p.id == project_id)
    }

    pub fn projects(&self) -> &[Project] {
        &self.data().projects
    }

    pub fn active_projects(&self) -> Vec<&Project> {
        self.data().projects.iter().filter(|p| p.is_active()).collect()
    }

    /// Most recently started project, if any.
    pub fn latest_project(&self) -> Option<&Project> {
        self.data().projects.last()
    }

    /// Join a project with its tasks, reviews and summaries.
    pub fn project_data(&self, project_id: &str) -> Option<ProjectData> {
        let project = self.project(project_id)?.clone();
        let data = self.data();
        Some(ProjectData {
            project,
            tasks: data
                .tasks
                .iter()
                .filter(|t| t.project_id == project_id)
                .cloned()
                .collect(),
            reviews: data
                .reviews
                .iter()
                .filter(|r| r.project_id == project_id)
                .cloned()
                .collect(),
            summaries: data
                .summaries
                .iter()
                .filter(|s| s.project_id == project_id)
                .cloned()
                .collect(),
        })
    }

    fn project_index(&self, project_id: &str) -> Result<usize> {
        self.data()
            .projects
            .iter()
            .position(|p| p.id == project_id)
            .ok_or_else(|| StoreError::not_found("project", project_id))
    }
}

// ---------------------------------------------------------------------------
// Journal operations
// ---------------------------------------------------------------------------

impl Memory {
    /// Record a summary and bump the Summariser's counters.
    pub fn add_summary(
        &mut self,
        project: &ProjectHandle,
        summary_type: impl Into<String>,
        content: impl Into<String>,
        insights: Vec<String>,
        metrics: BTreeMap<String, serde_json::Value>,
    ) -> Result<&Summary> {
        let now = Utc::now();
        let summary_type = summary_type.into();
        let content = content.into();
        self.mutate(|data| {
            let summary = Summary {
                id: format!("summary_{}_{}", now.timestamp(), data.summaries.len()),
                project_id: project.id().to_string(),
                summary_type,
                content,
                insights,
                metrics,
                timestamp: now,
            };
            data.agent_stats.summariser.summaries_created += 1;
            data.agent_stats.summariser.insights_generated += summary.insights.len() as u64;
            data.summaries.push(summary);
        })?;

        let summary = &self.data().summaries[self.data().summaries.len() - 1];
        info!(
            project_id = %project,
            summary_type = %summary.summary_type,
            insights = summary.insights.len(),
            "summary recorded"
        );
        Ok(summary)
    }

    /// Record a system-level insight.
    pub fn add_system_insight(
        &mut self,
        project: &ProjectHandle,
        insight: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<()> {
        let record = SystemInsight {
            insight: insight.into(),
            category: category.into(),
            timestamp: Utc::now(),
            project_id: project.id().to_string(),
        };
        let category = record.category.clone();
        self.mutate(|data| data.system_insights.push(record))?;
        info!(project_id = %project, category = %category, "system insight recorded");
        Ok(())
    }

    /// Record the final message an agent produced during a phase.
    pub fn add_conversation(
        &mut self,
        project: &ProjectHandle,
        agent: AgentRole,
        message: impl Into<String>,
    ) -> Result<()> {
        let record = Conversation {
            agent: agent.name().to_string(),
            message: message.into(),
            project_id: project.id().to_string(),
            timestamp: Utc::now(),
        };
        self.mutate(|data| data.conversations.push(record))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

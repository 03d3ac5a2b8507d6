use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// AgentRole
// ---------------------------------------------------------------------------

/// The four agent roles. Serialized with their display names because the
/// persisted counters object is keyed by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentRole {
    Planner,
    Executor,
    Critic,
    Summariser,
}

impl AgentRole {
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Planner,
        AgentRole::Executor,
        AgentRole::Critic,
        AgentRole::Summariser,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::Planner => "Planner",
            AgentRole::Executor => "Executor",
            AgentRole::Critic => "Critic",
            AgentRole::Summariser => "Summariser",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Reviewed,
}

impl TaskStatus {
    /// Returns `true` when a transition from `self` to `target` is valid.
    ///
    /// Status only moves forward; `Reviewed` is terminal.
    pub fn can_transition_to(&self, target: &TaskStatus) -> bool {
        matches!(
            (self, target),
            (TaskStatus::Pending, TaskStatus::Completed)
                | (TaskStatus::Completed, TaskStatus::Reviewed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Reviewed)
    }

    /// Completed or reviewed, i.e. the work itself is done.
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Reviewed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Reviewed => "reviewed",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "[ ]",
            TaskStatus::Completed => "[~]",
            TaskStatus::Reviewed => "[x]",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Active => f.write_str("active"),
            ProjectStatus::Completed => f.write_str("completed"),
        }
    }
}

/// Which of the fixed agent sequences drives a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    CompletePipeline,
    Collaborative,
    Iterative,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::CompletePipeline => "complete_pipeline",
            WorkflowType::Collaborative => "collaborative",
            WorkflowType::Iterative => "iterative",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics snapshot. Zeroed at project start, computed at project end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    #[serde(default)]
    pub tasks_created: usize,
    #[serde(default)]
    pub tasks_completed: usize,
    /// Percentage of tasks that reached `completed` or `reviewed`.
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub average_score: f64,
    #[serde(default)]
    pub total_reviews: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub goal: String,
    pub workflow_type: WorkflowType,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub metrics: ProjectMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,
}

impl Project {
    /// `sequence` is the number of projects already stored; together with the
    /// start second it keeps ids unique within one memory file.
    pub fn new(goal: impl Into<String>, workflow_type: WorkflowType, sequence: usize) -> Self {
        let now = Utc::now();
        Self {
            id: format!("proj_{}_{}", now.timestamp(), sequence),
            goal: goal.into(),
            workflow_type,
            start_time: now,
            end_time: None,
            status: ProjectStatus::Active,
            metrics: ProjectMetrics::default(),
            final_summary: None,
            insights: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub review_score: Option<u8>,
    #[serde(default)]
    pub review_feedback: Option<String>,
    #[serde(default)]
    pub revision_count: u32,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            reviewed_at: None,
            result: None,
            review_score: None,
            review_feedback: None,
            revision_count: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Review / Summary / Conversation / SystemInsight
// ---------------------------------------------------------------------------

/// Created alongside a task's move to `reviewed`. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub task_id: String,
    pub project_id: String,
    pub score: u8,
    pub feedback: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub id: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub summary_type: String,
    pub content: String,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub agent: String,
    pub message: String,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInsight {
    pub insight: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub project_id: String,
}

// ---------------------------------------------------------------------------
// AgentStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerStats {
    #[serde(default)]
    pub tasks_created: u64,
    #[serde(default)]
    pub projects_planned: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorStats {
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub execution_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticStats {
    #[serde(default)]
    pub reviews_completed: u64,
    /// Running mean of every score recorded, kept unrounded.
    #[serde(default)]
    pub average_score: f64,
    #[serde(default)]
    pub revisions_requested: u64,
}

impl CriticStats {
    /// Fold one more score into the running mean.
    pub fn record_score(&mut self, score: u8) {
        let n = self.reviews_completed as f64;
        self.average_score = (self.average_score * n + f64::from(score)) / (n + 1.0);
        self.reviews_completed += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummariserStats {
    #[serde(default)]
    pub summaries_created: u64,
    #[serde(default)]
    pub insights_generated: u64,
}

/// Per-role counters, mutated incrementally as side effects of store
/// operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    #[serde(rename = "Planner", default)]
    pub planner: PlannerStats,
    #[serde(rename = "Executor", default)]
    pub executor: ExecutorStats,
    #[serde(rename = "Critic", default)]
    pub critic: CriticStats,
    #[serde(rename = "Summariser", default)]
    pub summariser: SummariserStats,
}

// ---------------------------------------------------------------------------
// MemoryData
// ---------------------------------------------------------------------------

/// The whole persisted document. `Default` is the empty skeleton written on
/// first start and on reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryData {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Kept for file compatibility; nothing writes it.
    #[serde(default)]
    pub debates: Vec<serde_json::Value>,
    #[serde(default)]
    pub summaries: Vec<Summary>,
    #[serde(default)]
    pub agent_stats: AgentStats,
    #[serde(default)]
    pub system_insights: Vec<SystemInsight>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_skeleton_has_every_top_level_key() {
        let value = serde_json::to_value(MemoryData::default()).unwrap();
        for key in [
            "projects",
            "tasks",
            "conversations",
            "reviews",
            "debates",
            "summaries",
            "agent_stats",
            "system_insights",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        for role in AgentRole::ALL {
            assert!(value["agent_stats"].get(role.name()).is_some());
        }
        assert_eq!(value["agent_stats"]["Critic"]["average_score"], 0.0);
    }

    #[test]
    fn critic_running_mean() {
        let mut critic = CriticStats::default();
        for score in [80, 90, 75] {
            critic.record_score(score);
        }
        assert_eq!(critic.reviews_completed, 3);
        assert!((critic.average_score - 245.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn summary_type_field_is_renamed() {
        let summary = Summary {
            id: "summary_1".into(),
            project_id: "proj_1_0".into(),
            summary_type: "executive".into(),
            content: "done".into(),
            insights: vec![],
            metrics: BTreeMap::new(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["type"], "executive");
    }

    #[test]
    fn project_ids_carry_sequence() {
        let project = Project::new("goal", WorkflowType::Iterative, 4);
        assert!(project.id.starts_with("proj_"));
        assert!(project.id.ends_with("_4"));
        assert!(project.is_active());
    }
}

//! Read-only aggregate statistics over the whole memory document.

use serde::{Deserialize, Serialize};

use crate::store::Memory;
use crate::types::{AgentStats, ProjectStatus, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectCounts {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub reviewed: usize,
}

impl TaskCounts {
    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::Completed => self.completed,
            TaskStatus::Reviewed => self.reviewed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityCounts {
    pub conversations: usize,
    pub reviews: usize,
    pub summaries: usize,
    pub system_insights: usize,
}

/// Snapshot of the tracker, computed fresh on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub projects: ProjectCounts,
    pub tasks: TaskCounts,
    /// Mean review score across every reviewed task; 0 when none.
    pub average_score: f64,
    pub agent_stats: AgentStats,
    pub activity: ActivityCounts,
}

impl Memory {
    pub fn stats(&self) -> SystemStats {
        let data = self.data();

        let completed_projects = data
            .projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Completed)
            .count();

        let mut tasks = TaskCounts {
            total: data.tasks.len(),
            ..TaskCounts::default()
        };
        let mut score_sum = 0u64;
        let mut scored = 0usize;
        for task in &data.tasks {
            match task.status {
                TaskStatus::Pending => tasks.pending += 1,
                TaskStatus::Completed => tasks.completed += 1,
                TaskStatus::Reviewed => tasks.reviewed += 1,
            }
            if let Some(score) = task.review_score {
                score_sum += u64::from(score);
                scored += 1;
            }
        }

        SystemStats {
            projects: ProjectCounts {
                total: data.projects.len(),
                completed: completed_projects,
                active: data.projects.len() - completed_projects,
            },
            tasks,
            average_score: if scored == 0 {
                0.0
            } else {
                score_sum as f64 / scored as f64
            },
            agent_stats: data.agent_stats.clone(),
            activity: ActivityCounts {
                conversations: data.conversations.len(),
                reviews: data.reviews.len(),
                summaries: data.summaries.len(),
                system_insights: data.system_insights.len(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentRole, WorkflowType};

    #[test]
    fn empty_store_is_all_zeros() {
        let memory = Memory::in_memory();
        let stats = memory.stats();
        assert_eq!(stats, SystemStats::default());
        assert_eq!(stats.average_score, 0.0);
    }

    #[test]
    fn counts_reflect_store() {
        let mut memory = Memory::in_memory();
        let done = memory.start_project("one", WorkflowType::CompletePipeline).unwrap();
        let open = memory.start_project("two", WorkflowType::Iterative).unwrap();

        memory.add_task(&done, "t1", "a").unwrap();
        memory.add_task(&done, "t2", "b").unwrap();
        memory.add_task(&open, "t3", "c").unwrap();
        memory.complete_task("t1", "ok").unwrap();
        memory.complete_task("t2", "ok").unwrap();
        memory.review_task("t1", 60, "meh").unwrap();
        memory.review_task("t2", 90, "great").unwrap();
        memory.add_conversation(&done, AgentRole::Planner, "Planning complete!").unwrap();
        memory.end_project(&done, "finished", vec![]).unwrap();

        let stats = memory.stats();
        assert_eq!(stats.projects.total, 2);
        assert_eq!(stats.projects.completed, 1);
        assert_eq!(stats.projects.active, 1);
        assert_eq!(stats.tasks.total, 3);
        assert_eq!(stats.tasks.get(TaskStatus::Pending), 1);
        assert_eq!(stats.tasks.get(TaskStatus::Reviewed), 2);
        assert!((stats.average_score - 75.0).abs() < 1e-9);
        assert_eq!(stats.activity.reviews, 2);
        assert_eq!(stats.activity.conversations, 1);
        assert_eq!(stats.agent_stats.critic.reviews_completed, 2);
        assert_eq!(stats.agent_stats.planner.tasks_created, 3);
    }
}

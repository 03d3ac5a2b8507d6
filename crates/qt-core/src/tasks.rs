//! Task store: creation and the `pending -> completed -> reviewed` moves.

use chrono::Utc;
use tracing::{info, warn};

use crate::projects::ProjectHandle;
use crate::store::{Memory, Result, StoreError};
use crate::types::{Review, Task, TaskStatus};

impl Memory {
    /// Record a new `pending` task under `project` and bump the Planner's
    /// `tasks_created` counter.
    pub fn add_task(
        &mut self,
        project: &ProjectHandle,
        task_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<&Task> {
        let task = Task::new(task_id, project.id(), description);
        if self.task(&task.id).is_some() {
            return Err(StoreError::DuplicateId {
                entity: "task",
                id: task.id,
            });
        }

        self.mutate(|data| {
            data.tasks.push(task);
            data.agent_stats.planner.tasks_created += 1;
        })?;

        let task = &self.data().tasks[self.data().tasks.len() - 1];
        info!(task_id = %task.id, project_id = %task.project_id, "task created");
        Ok(task)
    }

    /// Move a `pending` task to `completed`, attaching `result`.
    ///
    /// Any other current status is rejected and leaves the record untouched.
    pub fn complete_task(&mut self, task_id: &str, result: impl Into<String>) -> Result<&Task> {
        let idx = self.transition_index(task_id, TaskStatus::Completed)?;

        let result = result.into();
        self.mutate(|data| {
            let task = &mut data.tasks[idx];
            task.status = TaskStatus::Completed;
            task.result = Some(result);
            task.completed_at = Some(Utc::now());
            data.agent_stats.executor.tasks_completed += 1;
        })?;

        info!(task_id, "task completed");
        Ok(&self.data().tasks[idx])
    }

    /// Move a `completed` task to `reviewed`, record the score and feedback,
    /// fold the score into the Critic's running mean and append a [`Review`].
    pub fn review_task(
        &mut self,
        task_id: &str,
        score: i64,
        feedback: impl Into<String>,
    ) -> Result<&Task> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or(StoreError::InvalidScore(score))?;
        let idx = self.transition_index(task_id, TaskStatus::Reviewed)?;
        let feedback = feedback.into();
        let now = Utc::now();

        self.mutate(|data| {
            let review_id = format!("review_{}_{}", now.timestamp(), data.reviews.len());
            let task = &mut data.tasks[idx];
            task.status = TaskStatus::Reviewed;
            task.review_score = Some(score);
            task.review_feedback = Some(feedback.clone());
            task.reviewed_at = Some(now);
            let project_id = task.project_id.clone();

            data.agent_stats.critic.record_score(score);
            data.reviews.push(Review {
                id: review_id,
                task_id: task_id.to_string(),
                project_id,
                score,
                feedback,
                timestamp: now,
            });
        })?;

        info!(task_id, score, "task reviewed");
        Ok(&self.data().tasks[idx])
    }

    /// Look up a task by id.
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.data().tasks.iter().find(|t| t.id == task_id)
    }

    /// Tasks of `project` currently in `status`, in creation order.
    pub fn tasks_by_status(&self, project: &ProjectHandle, status: TaskStatus) -> Vec<&Task> {
        self.data()
            .tasks
            .iter()
            .filter(|t| t.project_id == project.id() && t.status == status)
            .collect()
    }

    pub fn pending_tasks(&self, project: &ProjectHandle) -> Vec<&Task> {
        self.tasks_by_status(project, TaskStatus::Pending)
    }

    pub fn completed_tasks(&self, project: &ProjectHandle) -> Vec<&Task> {
        self.tasks_by_status(project, TaskStatus::Completed)
    }

    pub fn reviewed_tasks(&self, project: &ProjectHandle) -> Vec<&Task> {
        self.tasks_by_status(project, TaskStatus::Reviewed)
    }

    /// Index of `task_id` if it may move to `target`.
    fn transition_index(&self, task_id: &str, target: TaskStatus) -> Result<usize> {
        let idx = self
            .data()
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| StoreError::not_found("task", task_id))?;

        let current = self.data().tasks[idx].status;
        if !current.can_transition_to(&target) {
            warn!(task_id, from = %current, to = %target, "rejected task transition");
            return Err(StoreError::InvalidTransition {
                id: task_id.to_string(),
                from: current,
                to: target,
            });
        }
        Ok(idx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkflowType;

    fn memory_with_project() -> (Memory, ProjectHandle) {
        let mut memory = Memory::in_memory();
        let project = memory
            .start_project("write docs", WorkflowType::CompletePipeline)
            .unwrap();
        (memory, project)
    }

    #[test]
    fn new_task_is_pending_and_counted() {
        let (mut memory, project) = memory_with_project();
        let task = memory.add_task(&project, "t1", "outline").unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.project_id, project.id());
        assert_eq!(memory.data().agent_stats.planner.tasks_created, 1);
    }

    #[test]
    fn duplicate_task_id_rejected() {
        let (mut memory, project) = memory_with_project();
        memory.add_task(&project, "t1", "outline").unwrap();
        let err = memory.add_task(&project, "t1", "again").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(memory.data().tasks.len(), 1);
        assert_eq!(memory.data().agent_stats.planner.tasks_created, 1);
    }

    #[test]
    fn complete_only_from_pending() {
        let (mut memory, project) = memory_with_project();
        memory.add_task(&project, "t1", "outline").unwrap();

        let task = memory.complete_task("t1", "first result").unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());

        let before = memory.task("t1").cloned().unwrap();
        let err = memory.complete_task("t1", "second result").unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(memory.task("t1"), Some(&before));
        assert_eq!(memory.data().agent_stats.executor.tasks_completed, 1);
    }

    #[test]
    fn complete_unknown_task() {
        let (mut memory, _) = memory_with_project();
        let err = memory.complete_task("missing", "x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "task", .. }));
    }

    #[test]
    fn review_requires_completed() {
        let (mut memory, project) = memory_with_project();
        memory.add_task(&project, "t1", "outline").unwrap();

        let err = memory.review_task("t1", 90, "too early").unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert!(memory.data().reviews.is_empty());

        memory.complete_task("t1", "done").unwrap();
        let task = memory.review_task("t1", 90, "solid").unwrap();
        assert_eq!(task.status, TaskStatus::Reviewed);
        assert_eq!(task.review_score, Some(90));
        assert_eq!(memory.data().reviews.len(), 1);
        assert_eq!(memory.data().reviews[0].project_id, project.id());

        // Terminal.
        assert!(memory.review_task("t1", 50, "again").is_err());
        assert_eq!(memory.data().reviews.len(), 1);
    }

    #[test]
    fn review_score_out_of_range() {
        let (mut memory, project) = memory_with_project();
        memory.add_task(&project, "t1", "outline").unwrap();
        memory.complete_task("t1", "done").unwrap();

        assert!(matches!(
            memory.review_task("t1", 101, "x"),
            Err(StoreError::InvalidScore(101))
        ));
        assert!(matches!(
            memory.review_task("t1", -1, "x"),
            Err(StoreError::InvalidScore(-1))
        ));
        assert_eq!(memory.task("t1").unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn queries_are_scoped_to_project() {
        let mut memory = Memory::in_memory();
        let a = memory.start_project("a", WorkflowType::Iterative).unwrap();
        let b = memory.start_project("b", WorkflowType::Iterative).unwrap();
        memory.add_task(&a, "a1", "first").unwrap();
        memory.add_task(&a, "a2", "second").unwrap();
        memory.add_task(&b, "b1", "other").unwrap();
        memory.complete_task("a2", "ok").unwrap();

        let pending: Vec<_> = memory.pending_tasks(&a).iter().map(|t| t.id.clone()).collect();
        assert_eq!(pending, vec!["a1"]);
        assert_eq!(memory.completed_tasks(&a).len(), 1);
        assert_eq!(memory.pending_tasks(&b).len(), 1);
        assert!(memory.reviewed_tasks(&b).is_empty());
    }
}

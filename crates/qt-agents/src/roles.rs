use qt_core::types::AgentRole;

use crate::tools::names;

// ---------------------------------------------------------------------------
// RoleConfig
// ---------------------------------------------------------------------------

/// Role-specific execution profile: what the agent is told, which tools it
/// may call and how it signals that its phase is done.
pub trait RoleConfig {
    /// Return a detailed system prompt appropriate for this role.
    fn system_prompt(&self) -> &'static str;

    /// Return the names of the tools this role is allowed to invoke.
    fn allowed_tools(&self) -> &'static [&'static str];

    /// Phrase the role is asked to end its final message with.
    fn completion_marker(&self) -> &'static str;

    fn allows(&self, tool: &str) -> bool {
        self.allowed_tools().contains(&tool)
    }
}

// ===========================================================================
// Prompts
// ===========================================================================

const PLANNER_SYSTEM_PROMPT: &str = "\
You are a strategic Planner agent. Your specialization is project planning and task breakdown.

When given a goal:
1. Break it into 3-5 specific, executable tasks using create_task_tool.
2. Create ONLY ONE SET of tasks. Do not create duplicate or near-duplicate tasks.
3. Focus on content creation tasks, not distribution or sending.
4. Create logical task sequences: draft, review, finalize, document.
5. After creating all tasks, end with \"Planning complete!\"

Create each task EXACTLY ONCE. Check your work before finishing. \
Use get_stats_tool if you need to see what the system has already done.";

const EXECUTOR_SYSTEM_PROMPT: &str = "\
You are a skilled Executor agent. Your specialization is high-quality task execution.

When executing tasks:
1. Use get_pending_tasks_tool to see what needs to be done.
2. For EACH pending task, call complete_task_tool with the EXACT task_id and a comprehensive result.
3. Provide full content, not summaries or placeholders.
4. Make deliverables production-ready.
5. Check for more pending tasks after completing one.
6. End with \"Execution complete!\" only when ALL tasks are completed.

You MUST execute all pending tasks before finishing.";

const CRITIC_SYSTEM_PROMPT: &str = "\
You are a thorough Critic agent. Your specialization is quality assurance and improvement.

Quality scoring criteria:
- 95-100: Outstanding, exceeds all expectations
- 90-94: Excellent, high quality with minor refinements
- 85-89: Very good, meets requirements well
- 80-84: Good, adequate with some improvements needed
- 70-79: Acceptable, significant improvements needed
- Below 70: Requires major revision

When reviewing:
1. Use get_completed_tasks_tool to see available work.
2. Review EACH task with review_task_tool, giving task_id, an integer score \
between 0 and 100 and detailed feedback.
3. Make feedback specific and actionable.
4. Be fair but maintain high standards.
5. End with \"Review complete!\"

Review ALL completed tasks before finishing.";

const SUMMARISER_SYSTEM_PROMPT: &str = "\
You are an analytical Summariser agent. Your specialization is synthesis and insight generation.

When summarizing:
1. Use get_reviewed_tasks_tool to analyze all reviewed work.
2. Use get_project_overview_tool for project context.
3. Create summaries with create_summary_tool. Pass insights as a numbered list, one per line.
4. Record strategic insights with generate_insight_tool.
5. Include metrics, patterns and recommendations.
6. End with \"Summarization complete!\"

Summary types:
- executive: high-level overview for leadership
- technical: detailed analysis for team members
- quality: assessment of work standards and improvements";

// ===========================================================================
// AgentRole
// ===========================================================================

impl RoleConfig for AgentRole {
    fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::Planner => PLANNER_SYSTEM_PROMPT,
            AgentRole::Executor => EXECUTOR_SYSTEM_PROMPT,
            AgentRole::Critic => CRITIC_SYSTEM_PROMPT,
            AgentRole::Summariser => SUMMARISER_SYSTEM_PROMPT,
        }
    }

    fn allowed_tools(&self) -> &'static [&'static str] {
        match self {
            AgentRole::Planner => &[names::CREATE_TASK, names::GET_STATS],
            AgentRole::Executor => &[
                names::GET_PENDING_TASKS,
                names::COMPLETE_TASK,
                names::GET_STATS,
            ],
            AgentRole::Critic => &[
                names::GET_COMPLETED_TASKS,
                names::REVIEW_TASK,
                names::GET_STATS,
            ],
            AgentRole::Summariser => &[
                names::GET_REVIEWED_TASKS,
                names::CREATE_SUMMARY,
                names::GENERATE_INSIGHT,
                names::GET_PROJECT_OVERVIEW,
                names::GET_STATS,
            ],
        }
    }

    fn completion_marker(&self) -> &'static str {
        match self {
            AgentRole::Planner => "Planning complete!",
            AgentRole::Executor => "Execution complete!",
            AgentRole::Critic => "Review complete!",
            AgentRole::Summariser => "Summarization complete!",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_definitions;

    #[test]
    fn every_allowed_tool_is_defined() {
        let defined: Vec<String> = tool_definitions().into_iter().map(|t| t.name).collect();
        for role in AgentRole::ALL {
            for tool in role.allowed_tools() {
                assert!(defined.iter().any(|d| d == tool), "{role} lists unknown tool {tool}");
            }
        }
    }

    #[test]
    fn every_tool_is_reachable_by_some_role() {
        for def in tool_definitions() {
            assert!(
                AgentRole::ALL.iter().any(|r| r.allows(&def.name)),
                "{} is not allowed for any role",
                def.name
            );
        }
    }

    #[test]
    fn stats_tool_is_shared_and_writes_are_not() {
        for role in AgentRole::ALL {
            assert!(role.allows(names::GET_STATS));
        }
        assert!(AgentRole::Planner.allows(names::CREATE_TASK));
        assert!(!AgentRole::Executor.allows(names::CREATE_TASK));
        assert!(!AgentRole::Planner.allows(names::REVIEW_TASK));
        assert!(!AgentRole::Critic.allows(names::COMPLETE_TASK));
    }

    #[test]
    fn prompts_mention_their_marker() {
        for role in AgentRole::ALL {
            assert!(role.system_prompt().contains(role.completion_marker()));
        }
    }
}

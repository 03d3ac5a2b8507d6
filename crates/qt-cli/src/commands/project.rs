use qt_agents::report::render_project;
use qt_core::{Memory, ProjectData};

use super::Context;

/// The requested project, or the most recent one when `id` is `None`.
pub fn select(memory: &Memory, id: Option<&str>) -> anyhow::Result<Option<ProjectData>> {
    let id = match id {
        Some(id) => id.to_string(),
        None => match memory.latest_project() {
            Some(p) => p.id.clone(),
            None => return Ok(None),
        },
    };
    memory
        .project_data(&id)
        .map(Some)
        .ok_or_else(|| anyhow::anyhow!("no project with id {id}; see `quartet history`"))
}

pub fn run(ctx: &Context, id: Option<&str>) -> anyhow::Result<()> {
    let memory = ctx.open_memory()?;
    match select(&memory, id)? {
        Some(data) => println!("{}", render_project(&data)),
        None => println!("No projects yet. Start one with `quartet run <goal>`."),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qt_core::types::WorkflowType;

    #[test]
    fn latest_is_the_default() {
        let mut memory = Memory::in_memory();
        assert!(select(&memory, None).unwrap().is_none());

        let first = memory.start_project("first", WorkflowType::CompletePipeline).unwrap();
        let second = memory.start_project("second", WorkflowType::Iterative).unwrap();

        assert_eq!(select(&memory, None).unwrap().unwrap().project.id, second.id());
        assert_eq!(
            select(&memory, Some(first.id())).unwrap().unwrap().project.goal,
            "first"
        );
        assert!(select(&memory, Some("project_missing")).is_err());
    }
}

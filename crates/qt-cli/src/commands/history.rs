use qt_agents::report::render_history;

use super::Context;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let memory = ctx.open_memory()?;
    println!("{}", render_history(memory.projects()));
    Ok(())
}

use qt_agents::report::render_dashboard;

use super::Context;

/// Run the `dashboard` subcommand. Read-only, so no lock is taken.
pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let memory = ctx.open_memory()?;
    println!("{}", render_dashboard(&memory.stats()));
    Ok(())
}

use super::Context;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let _lock = ctx.lock("reset")?;
    let mut memory = ctx.open_memory()?;
    memory.reset()?;
    println!("Memory reset: {}", ctx.memory_path().display());
    Ok(())
}

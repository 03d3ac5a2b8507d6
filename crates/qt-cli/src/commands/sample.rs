use qt_core::types::WorkflowType;

use super::Context;

pub const SAMPLE_GOALS: [&str; 4] = [
    "develop a comprehensive marketing strategy",
    "create a technical documentation system",
    "design a customer onboarding process",
    "build a project management framework",
];

/// 1-based lookup.
pub fn sample_goal(n: usize) -> anyhow::Result<&'static str> {
    n.checked_sub(1)
        .and_then(|i| SAMPLE_GOALS.get(i).copied())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no sample {n}; pick a number from 1 to {}",
                SAMPLE_GOALS.len()
            )
        })
}

pub async fn run(ctx: &Context, n: Option<usize>, workflow: WorkflowType) -> anyhow::Result<()> {
    let Some(n) = n else {
        println!("Sample goals:");
        for (i, goal) in SAMPLE_GOALS.iter().enumerate() {
            println!("  {}. {goal}", i + 1);
        }
        println!("\nRun one with `quartet sample <n> [--workflow ...]`.");
        return Ok(());
    };
    let goal = sample_goal(n)?;
    super::run::run(ctx, goal, workflow).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;

    #[test]
    fn samples_are_one_based() {
        assert_eq!(sample_goal(1).unwrap(), "develop a comprehensive marketing strategy");
        assert_eq!(sample_goal(4).unwrap(), "build a project management framework");
        assert!(sample_goal(0).is_err());
        assert!(sample_goal(5).unwrap_err().to_string().contains("1 to 4"));
    }

    #[tokio::test]
    async fn listing_needs_no_key_or_memory() {
        let (_dir, ctx) = context();
        run(&ctx, None, WorkflowType::Iterative).await.unwrap();
        assert!(!ctx.memory_path().exists());
    }
}

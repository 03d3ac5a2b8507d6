mod commands;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use qt_core::config::Config;
use qt_core::types::WorkflowType;

use commands::Context;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// quartet -- a planner, executor, critic and summariser working one goal
/// through a shared JSON memory.
#[derive(Parser)]
#[command(name = "quartet", version, about)]
struct Cli {
    /// Config file (default: ~/.quartet/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Memory document, overriding `memory.path` from the config.
    #[arg(long, global = true)]
    memory: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow for a goal.
    Run {
        /// What the agents should achieve.
        goal: String,
        #[arg(long, value_enum, default_value_t = WorkflowArg::Pipeline)]
        workflow: WorkflowArg,
    },

    /// Run one of the built-in sample goals, or list them.
    Sample {
        /// 1-based sample number. Lists the samples when omitted.
        n: Option<usize>,
        #[arg(long, value_enum, default_value_t = WorkflowArg::Pipeline)]
        workflow: WorkflowArg,
    },

    /// Show system statistics (default when no subcommand is given).
    Dashboard,

    /// List every project.
    History,

    /// Show one project's tasks, summaries and metrics.
    Project {
        /// Project id. The most recent project when omitted.
        id: Option<String>,
    },

    /// Invoke one agent tool by hand.
    Tool {
        /// Tool name, e.g. `get_pending_tasks_tool`.
        name: String,
        /// Project the call acts on.
        #[arg(long)]
        project: String,
        /// Arguments as a JSON object.
        #[arg(long)]
        args: Option<String>,
    },

    /// Erase the memory document.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WorkflowArg {
    Pipeline,
    Collaborative,
    Iterative,
}

impl From<WorkflowArg> for WorkflowType {
    fn from(arg: WorkflowArg) -> Self {
        match arg {
            WorkflowArg::Pipeline => WorkflowType::CompletePipeline,
            WorkflowArg::Collaborative => WorkflowType::Collaborative,
            WorkflowArg::Iterative => WorkflowType::Iterative,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load config")?;

    qt_telemetry::logging::init(
        "quartet",
        &config.general.log_level,
        cli.json_logs || config.general.json_logs(),
    );

    let memory_path = cli
        .memory
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.memory.path));
    let ctx = Context::new(config, memory_path);

    match cli.command {
        None | Some(Commands::Dashboard) => commands::dashboard::run(&ctx)?,
        Some(Commands::Run { goal, workflow }) => {
            commands::run::run(&ctx, &goal, workflow.into()).await?
        }
        Some(Commands::Sample { n, workflow }) => {
            commands::sample::run(&ctx, n, workflow.into()).await?
        }
        Some(Commands::History) => commands::history::run(&ctx)?,
        Some(Commands::Project { id }) => commands::project::run(&ctx, id.as_deref())?,
        Some(Commands::Tool {
            name,
            project,
            args,
        }) => commands::tool::run(&ctx, &name, &project, args.as_deref())?,
        Some(Commands::Reset) => commands::reset::run(&ctx)?,
    }

    Ok(())
}

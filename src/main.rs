// kimi-agent - run a shell plan or a single command through the executor

use clap::Parser;
use kimi_agent::agent::{AgentConfig, PlanRunner, format_result};
use kimi_agent::executor::ExecutorConfig;
use std::path::PathBuf;
use tokio::signal;
use tracing::{Level, info, warn};
use tracing_subscriber::fmt;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "kimi-agent")]
#[command(about = "Run a shell plan or a single command with the agent executor")]
struct Args {
    /// Plan file: one shell command per line, `#` starts a comment
    plan: Option<PathBuf>,

    /// Run a single command instead of a plan file
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Per-step timeout in seconds (overrides AGENT_PLAN_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,

    /// Disable the safety deny-list
    #[arg(long)]
    no_filter: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut agent_config = AgentConfig::from_env();
    if let Some(timeout) = args.timeout {
        agent_config.plan_step_timeout_secs = timeout;
    }
    if args.no_filter {
        agent_config.filter_commands = false;
    }

    let runner = PlanRunner::from_config(&agent_config, ExecutorConfig::default())?;

    if let Some(command) = args.command {
        println!("{}", runner.run_command(&command).await);
        return Ok(());
    }

    let Some(plan_path) = args.plan else {
        eprintln!("Usage: kimi-agent <plan-file> | kimi-agent -c <command>");
        std::process::exit(2);
    };

    let plan = tokio::fs::read_to_string(&plan_path).await?;
    info!(path = %plan_path.display(), "running plan");

    let handle = runner.spawn(plan);
    let token = handle.cancel_token();

    // Ctrl-C requests a cooperative stop: the step in flight finishes (or
    // times out), then the runner halts before the next line.
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current step");
            token.cancel();
        }
    });

    let report = handle.join().await?;

    for step in &report.steps {
        println!("$ {}", step.command);
        println!("{}", format_result(&step.result));
    }

    info!(
        executed = report.steps.len(),
        cancelled = report.cancelled,
        "plan finished"
    );

    if report.steps.iter().any(|s| !s.result.success()) {
        std::process::exit(1);
    }
    Ok(())
}

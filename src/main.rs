//! solverd - concurrent reasoning solver
//!
//! CLI entry point: races N solving agents against one problem and streams
//! progress events as JSON lines on stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result, eyre};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use solverd::cli::{Cli, Command};
use solverd::config::Config;
use solverd::events::{EventLogEntry, create_event_bus};
use solverd::llm::available_models;
use solverd::orchestrator::{Orchestrator, latest_solution_path};
use solverd::task::{TaskParams, TaskRegistry};

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > RUST_LOG > default (INFO)
    let filter = match cli_log_level {
        Some(level) => EnvFilter::try_new(level).context("Invalid log level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    // Events go to stdout as JSON lines; logging stays on stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref())?;

    let config = Config::load(cli.config.as_deref());
    debug!(?config, "loaded config");

    match cli.command {
        Command::Solve {
            problem,
            agents,
            model,
            api_key,
            timeout,
            max_iterations,
            extra_prompts,
            solutions_dir,
        } => {
            run_solve(
                &config,
                problem,
                agents,
                model,
                api_key,
                timeout,
                max_iterations,
                extra_prompts,
                solutions_dir,
            )
            .await
        }
        Command::Models => {
            let models = available_models();
            println!("{}", serde_json::to_string_pretty(&models)?);
            Ok(())
        }
    }
}

/// Read the problem statement from a file when the argument names one
fn resolve_problem(problem: String) -> Result<String> {
    if Path::new(&problem).is_file() {
        debug!(path = %problem, "resolve_problem: reading problem from file");
        std::fs::read_to_string(&problem).with_context(|| format!("Failed to read problem file: {problem}"))
    } else {
        Ok(problem)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_solve(
    config: &Config,
    problem: String,
    agents: Option<u32>,
    model: Option<String>,
    api_key: Option<String>,
    timeout: Option<u64>,
    max_iterations: Option<u32>,
    extra_prompts: Vec<String>,
    solutions_dir: PathBuf,
) -> Result<()> {
    let api_key = api_key
        .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
        .ok_or_else(|| eyre!("No API key: pass --api-key or set OPENROUTER_API_KEY"))?;

    let problem_statement = resolve_problem(problem)?;

    let params = TaskParams {
        problem_statement,
        num_agents: agents.unwrap_or(config.default_num_agents),
        model: model.unwrap_or_else(|| config.default_model.clone()),
        api_key,
        other_prompts: extra_prompts,
        timeout: timeout.or(config.default_timeout_secs).map(Duration::from_secs),
        max_iterations: max_iterations.unwrap_or(config.default_max_iterations),
    };

    let registry = TaskRegistry::spawn();
    let bus = create_event_bus();
    let orchestrator = Orchestrator::new(registry.clone(), bus.clone()).with_solutions_dir(&solutions_dir);

    // Stream events to stdout as JSON lines while the run is in flight
    let mut rx = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match serde_json::to_string(&EventLogEntry::new(event)) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to serialize event"),
            }
        }
    });

    let task_id = orchestrator.create_task(params).await?;
    info!(%task_id, "created task");

    let stats = orchestrator.run_task(&task_id).await?;

    // Let the printer drain before tearing it down
    tokio::time::sleep(Duration::from_millis(100)).await;
    printer.abort();

    println!("{}", serde_json::to_string_pretty(&stats)?);

    if stats.solution_found {
        info!(
            winner = ?stats.solution_agent_id,
            file = %latest_solution_path(&solutions_dir).display(),
            "solution written"
        );
    } else {
        warn!(%task_id, "no agent produced a verified solution");
    }

    Ok(())
}

//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// solverd - concurrent reasoning solver
#[derive(Parser)]
#[command(
    name = "sd",
    about = "Race N draft/verify/correct agents against one problem, first verified solution wins",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a solve task to completion
    Solve {
        /// Problem statement, or a path to a file containing it
        problem: String,

        /// Number of concurrent agents
        #[arg(short, long)]
        agents: Option<u32>,

        /// Model id
        #[arg(short, long)]
        model: Option<String>,

        /// OpenRouter API key (falls back to OPENROUTER_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Per-agent timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Maximum correction iterations per agent
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Extra instruction fragments appended to the problem
        #[arg(long = "extra-prompt")]
        extra_prompts: Vec<String>,

        /// Directory winning solutions are written to
        #[arg(long, default_value = "solutions")]
        solutions_dir: PathBuf,
    },

    /// List the models with a predefined configuration
    Models,
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stager_core::task_manager::{TaskManager, TaskManagerConfig};
use tracing_subscriber::EnvFilter;

mod commands;

/// Stager - Installs and maintains managed PHP applications
#[derive(Parser)]
#[command(name = "stager")]
#[command(about = "Inspect a project's dependencies and run durable package-manager tasks")]
#[command(version)]
struct Cli {
    /// Path to the project root (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the manifest, lockfile and vendor directory are in order
    Status {
        /// Print the raw status document
        #[arg(long)]
        json: bool,
    },
    /// Create, run and inspect the project's task
    Task {
        #[command(subcommand)]
        task_command: TaskCommands,
    },
    /// Manager configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task that sets up a new project
    CreateProject {
        /// Platform version, e.g. 4.13
        #[arg(long)]
        version: String,
        /// Only require the core bundle
        #[arg(long)]
        core_only: bool,
        /// Write the manifest without installing packages
        #[arg(long)]
        no_install: bool,
    },
    /// Create a task that installs the locked packages
    Install {
        #[arg(long)]
        dry_run: bool,
    },
    /// Create a task that updates packages
    Update {
        /// Packages to update; all when empty
        packages: Vec<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Create a task that regenerates the autoloader
    DumpAutoload,
    /// Run or resume the current task
    Run {
        /// Stream console output while the task runs
        #[arg(long)]
        follow: bool,
    },
    /// Retry a failed task from the failed operation
    Retry {
        #[arg(long)]
        follow: bool,
    },
    /// Show the current task or one operation's console
    Show {
        /// Operation index to print the console of
        #[arg(long)]
        operation: Option<usize>,
        /// First console chunk to print
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        json: bool,
    },
    /// Stop the current task at the next operation boundary
    Abort,
    /// Remove the current task
    Delete,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the JSON schema of .stager/config.yml
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STAGER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // The schema is available even when the config file itself is broken
    if let Commands::Config { config_command } = &cli.command {
        return commands::config::execute(config_command);
    }

    tracing::debug!(project_dir = %cli.project_dir.display(), "opening project");

    // Initialize task manager with all business logic
    let manager = TaskManager::new(TaskManagerConfig {
        project_dir: cli.project_dir,
    })
    .context("Failed to open project")?;

    // Execute command (CLI layer only handles presentation)
    match cli.command {
        Commands::Status { json } => commands::status::execute(&manager, json),
        Commands::Task { task_command } => commands::task::execute(&manager, task_command).await,
        Commands::Config { .. } => Ok(()),
    }
}

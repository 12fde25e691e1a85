use std::time::Duration;

use anyhow::{Context, Result};
use colored::*;
use serde_json::json;
use stager_core::results::TaskInfo;
use stager_core::task_manager::TaskManager;
use stager_core::tasks::{CREATE_PROJECT, DUMP_AUTOLOAD, INSTALL, UPDATE};
use stager_operation_protocol::{OperationStatus, TaskConfig, TaskStatus};

use crate::TaskCommands;

const FOLLOW_INTERVAL: Duration = Duration::from_millis(250);

pub async fn execute(manager: &TaskManager, command: TaskCommands) -> Result<()> {
    match command {
        TaskCommands::CreateProject {
            version,
            core_only,
            no_install,
        } => create(
            manager,
            TaskConfig::new(CREATE_PROJECT)
                .with_option("version", json!(version))
                .with_option("core-only", json!(core_only))
                .with_option("no-install", json!(no_install)),
        ),
        TaskCommands::Install { dry_run } => create(
            manager,
            TaskConfig::new(INSTALL).with_option("dry-run", json!(dry_run)),
        ),
        TaskCommands::Update { packages, dry_run } => create(
            manager,
            TaskConfig::new(UPDATE)
                .with_option("packages", json!(packages))
                .with_option("dry-run", json!(dry_run)),
        ),
        TaskCommands::DumpAutoload => create(manager, TaskConfig::new(DUMP_AUTOLOAD)),
        TaskCommands::Run { follow } => run(manager, false, follow).await,
        TaskCommands::Retry { follow } => run(manager, true, follow).await,
        TaskCommands::Show {
            operation,
            offset,
            json,
        } => show(manager, operation, offset, json),
        TaskCommands::Abort => {
            let info = manager.abort_task()?;
            if info.status == TaskStatus::Aborted {
                println!("{} {}", "✓".green().bold(), "Task aborted".bold());
            } else {
                println!(
                    "{} {}",
                    "…".yellow().bold(),
                    "Abort requested; the task stops after the current operation".bold()
                );
            }
            Ok(())
        }
        TaskCommands::Delete => {
            manager.delete_task()?;
            println!("{} {}", "✓".green().bold(), "Task deleted".bold());
            Ok(())
        }
    }
}

fn create(manager: &TaskManager, config: TaskConfig) -> Result<()> {
    let info = manager
        .create_task(config)
        .context("Failed to create task")?;

    println!("{} {}", "Created task".bold(), info.name.cyan());
    print_operations(&info);
    println!();
    println!("Start it with {}", "stager task run --follow".bold());
    Ok(())
}

async fn run(manager: &TaskManager, retry: bool, follow: bool) -> Result<()> {
    let task_run = async {
        if retry {
            manager.retry_task().await
        } else {
            manager.run_task().await
        }
    };

    let info = if follow {
        tokio::pin!(task_run);
        let mut cursors = Vec::new();
        let mut interval = tokio::time::interval(FOLLOW_INTERVAL);

        let result = loop {
            tokio::select! {
                result = &mut task_run => break result,
                _ = interval.tick() => print_new_output(manager, &mut cursors)?,
            }
        };
        print_new_output(manager, &mut cursors)?;
        result?
    } else {
        task_run.await?
    };

    println!();
    print_operations(&info);
    match info.status {
        TaskStatus::Complete => println!(
            "{} {}",
            "✓".green().bold(),
            "Task completed successfully!".green().bold()
        ),
        TaskStatus::Aborted => println!("{} {}", "■".yellow().bold(), "Task aborted".yellow().bold()),
        _ => {
            println!("{} {}", "✗".red().bold(), "Task failed".red().bold());
            println!(
                "Inspect the output with {} and retry with {}",
                "stager task show --operation <index>".bold(),
                "stager task retry".bold()
            );
        }
    }
    Ok(())
}

/// Print console chunks that arrived since the last call
///
/// `cursors` holds one read position per operation; an operation's summary
/// is printed before its first chunk.
fn print_new_output(manager: &TaskManager, cursors: &mut Vec<usize>) -> Result<()> {
    let Some(task) = manager.current_task()? else {
        return Ok(());
    };
    cursors.resize(task.operations.len(), 0);

    for (operation, cursor) in task.operations.iter().zip(cursors.iter_mut()) {
        let read = operation.console.read_from(*cursor);
        if read.chunks.is_empty() {
            continue;
        }
        if *cursor == 0 {
            println!("{} {}", ">".cyan().bold(), operation.summary.bold());
        }
        for chunk in &read.chunks {
            print!("{}", chunk);
        }
        *cursor = read.next_cursor;
    }
    Ok(())
}

fn show(manager: &TaskManager, operation: Option<usize>, offset: usize, json: bool) -> Result<()> {
    if let Some(index) = operation {
        let read = manager.read_console(index, offset)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&read)?);
        } else {
            for chunk in &read.chunks {
                print!("{}", chunk);
            }
        }
        return Ok(());
    }

    let Some(info) = manager.task_info()? else {
        if json {
            println!("null");
        } else {
            println!("{}", "No task".dimmed());
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        "Task".bold().underline(),
        info.name.cyan(),
        format!("[{}]", info.status.as_str()).bold()
    );
    println!(
        "{} {}",
        "Updated:".bright_black(),
        info.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    print_operations(&info);
    Ok(())
}

fn print_operations(info: &TaskInfo) {
    for operation in &info.operations {
        let status = match operation.status {
            OperationStatus::Complete => "complete".green(),
            OperationStatus::Error => "error".red(),
            OperationStatus::Running => "running".cyan(),
            OperationStatus::Skipped => "skipped".bright_black(),
            OperationStatus::Pending => "pending".normal(),
        };
        println!(
            "  {}. {} {} {}",
            operation.index,
            format!("[{}]", status).bold(),
            operation.summary,
            format!("({} lines)", operation.console_lines).dimmed()
        );
    }
}

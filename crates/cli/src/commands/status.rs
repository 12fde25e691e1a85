use anyhow::Result;
use colored::*;
use stager_core::task_manager::TaskManager;

fn mark(ok: bool) -> ColoredString {
    if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    }
}

pub fn execute(manager: &TaskManager, json: bool) -> Result<()> {
    let state = manager.composer_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Project".bold().underline(),
        manager.environment().project_dir().display()
    );

    if !state.json.found {
        println!("  {} {}", mark(false), "No managed composer.json found".dimmed());
        return Ok(());
    }

    println!("  {} composer.json found", mark(true));
    match &state.json.error {
        Some(error) => println!("  {} {}", mark(false), error.red()),
        None => println!("  {} composer.json is valid", mark(state.json.valid)),
    }

    if state.lock.found {
        let freshness = if state.lock.fresh {
            "up to date".green()
        } else {
            "out of date".yellow()
        };
        println!("  {} composer.lock {}", mark(state.lock.fresh), freshness);
    } else {
        println!("  {} composer.lock {}", mark(false), "missing".dimmed());
    }

    if state.vendor.found {
        println!("  {} vendor directory present", mark(true));
    } else {
        println!("  {} vendor directory {}", mark(false), "missing".dimmed());
    }

    Ok(())
}

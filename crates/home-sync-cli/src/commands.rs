//! CLI command implementations

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{json, Value};
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use home_sync_core::import_export::{export_config, import_config};
use home_sync_core::{
    run_startup_sync, ApiEndpoints, AutoPushScheduler, AutoPushStatus, CommandHandler,
    FileConfigStore, HttpConnector, Response, StartupOutcome, SyncService,
};

use crate::args::{Cli, Command};

/// Run one subcommand and map the result to an exit code.
pub async fn run_cli(cli: Cli) -> ExitCode {
    let service = match build_service(&cli) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{} Failed to open config store: {e:#}", "✗".red());
            return ExitCode::from(1);
        }
    };
    let handler = CommandHandler::new(service.clone());

    let result = match cli.command {
        Command::Get => send(&handler, json!({ "type": "getConfig" })).await,
        Command::Set { patch } => cmd_set(&handler, &patch).await,
        Command::Pull => send(&handler, json!({ "type": "pullRemote" })).await,
        Command::Push => send(&handler, json!({ "type": "pushRemote" })).await,
        Command::Test => send(&handler, json!({ "type": "testRemote" })).await,
        Command::Status => cmd_status(&service),
        Command::Export { file } => cmd_export(&service, file.as_deref()),
        Command::Import { file } => cmd_import(&service, &file),
        Command::Startup => cmd_startup(&handler).await,
        Command::Watch { debounce_ms } => {
            cmd_watch(service, Duration::from_millis(debounce_ms)).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "✗".red());
            ExitCode::from(1)
        }
    }
}

fn build_service(cli: &Cli) -> Result<Arc<SyncService>> {
    let dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => FileConfigStore::default_dir()?,
    };
    log::debug!("[Cli] Config dir: {}", dir.display());

    let mut endpoints = ApiEndpoints::default();
    if let Some(github) = &cli.github_api {
        endpoints.github = github.clone();
    }
    if let Some(gitee) = &cli.gitee_api {
        endpoints.gitee = gitee.clone();
    }

    let service = SyncService::new(
        Arc::new(FileConfigStore::new(dir)),
        Arc::new(HttpConnector::new(endpoints)),
    );
    service.ensure_initialized()?;
    Ok(Arc::new(service))
}

fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(source).with_context(|| format!("read {source}"))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a protocol response: data on stdout, status line on stderr.
fn report(response: Response) -> Result<ExitCode> {
    if !response.ok {
        eprintln!(
            "{} {}",
            "✗".red(),
            response.error.as_deref().unwrap_or("request failed")
        );
        return Ok(ExitCode::from(1));
    }
    if let Some(data) = &response.data {
        print_json(data)?;
    }
    match &response.last_sync_at {
        Some(at) => eprintln!("{} Synced at {at}", "✓".green()),
        None => eprintln!("{} OK", "✓".green()),
    }
    Ok(ExitCode::SUCCESS)
}

async fn send(handler: &CommandHandler, message: Value) -> Result<ExitCode> {
    report(handler.handle_message(&message).await)
}

async fn cmd_set(handler: &CommandHandler, source: &str) -> Result<ExitCode> {
    let text = if source == "-" {
        read_input(source)?
    } else {
        source.to_string()
    };
    let patch: Value = serde_json::from_str(&text).context("patch is not valid JSON")?;
    send(handler, json!({ "type": "setConfig", "data": patch })).await
}

fn cmd_status(service: &SyncService) -> Result<ExitCode> {
    let settings = service.sync_settings()?;
    let dash = || "-".dimmed().to_string();
    let or_dash = |s: &str| if s.is_empty() { dash() } else { s.to_string() };

    println!("\n{}", "Sync Status".bold().underline());
    println!("  {:10} {}", "remote:".bold(), or_dash(&settings.git_url));
    println!("  {:10} {}", "provider:".bold(), settings.provider);
    if settings.provider.is_repository() {
        println!(
            "  {:10} {}/{}",
            "repo:".bold(),
            or_dash(&settings.owner),
            or_dash(&settings.repo)
        );
        println!("  {:10} {}", "branch:".bold(), settings.branch);
        println!("  {:10} {}", "path:".bold(), settings.path);
    } else {
        println!("  {:10} {}", "gist:".bold(), or_dash(&settings.gist_id));
    }
    println!("  {:10} {}", "token:".bold(), or_dash(&settings.masked_token()));
    let auto_push = if settings.can_auto_push() {
        "on".green().to_string()
    } else if settings.auto_push {
        "on (incomplete: need gitUrl/token)".yellow().to_string()
    } else {
        "off".dimmed().to_string()
    };
    println!("  {:10} {auto_push}", "autoPush:".bold());
    let last = service.last_sync_at()?;
    println!(
        "  {:10} {}",
        "last sync:".bold(),
        last.unwrap_or_else(|| "never".dimmed().to_string())
    );
    println!();
    Ok(ExitCode::SUCCESS)
}

fn cmd_export(service: &SyncService, file: Option<&Path>) -> Result<ExitCode> {
    let text = export_config(service)?;
    match file {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .with_context(|| format!("write {}", path.display()))?;
            eprintln!("{} Exported to {}", "✓".green(), path.display());
        }
        None => println!("{text}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_import(service: &SyncService, source: &str) -> Result<ExitCode> {
    let text = read_input(source)?;
    import_config(service, &text)?;
    eprintln!("{} Imported config", "✓".green());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_startup(handler: &CommandHandler) -> Result<ExitCode> {
    Ok(match run_startup_sync(handler).await {
        StartupOutcome::Skipped => {
            eprintln!("{} Auto sync not configured, skipped", "-".dimmed());
            ExitCode::SUCCESS
        }
        StartupOutcome::Failed { stage, error } => {
            eprintln!("{} Startup {} failed: {error}", "✗".red(), stage.as_str());
            ExitCode::from(1)
        }
        StartupOutcome::Completed { last_sync_at } => {
            eprintln!(
                "{} Startup sync done{}",
                "✓".green(),
                last_sync_at.map(|at| format!(" ({at})")).unwrap_or_default()
            );
            ExitCode::SUCCESS
        }
    })
}

fn print_status(status: &AutoPushStatus) {
    match status {
        AutoPushStatus::Idle => {}
        AutoPushStatus::Incomplete => eprintln!(
            "{} Auto push is on but gitUrl/token are missing",
            "!".yellow()
        ),
        AutoPushStatus::Pushing => eprintln!("{} Pushing...", "…".dimmed()),
        AutoPushStatus::Pushed { last_sync_at } => {
            eprintln!("{} Pushed at {last_sync_at}", "✓".green())
        }
        AutoPushStatus::Failed(e) => eprintln!("{} Auto push failed: {e}", "✗".red()),
    }
}

async fn cmd_watch(service: Arc<SyncService>, debounce: Duration) -> Result<ExitCode> {
    let scheduler = AutoPushScheduler::with_debounce(service.clone(), debounce);
    let handler = CommandHandler::new(service).with_auto_push(scheduler.clone());

    let mut status = scheduler.subscribe();
    let printer = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            print_status(&current);
        }
    });

    eprintln!("Reading JSON patches from stdin (Ctrl-C to stop)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                scheduler.cancel();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let patch: Value = match serde_json::from_str(line) {
            Ok(patch) => patch,
            Err(e) => {
                eprintln!("{} Skipping invalid JSON: {e}", "✗".red());
                continue;
            }
        };
        let response = handler
            .handle_message(&json!({ "type": "setConfig", "data": patch }))
            .await;
        match response.error {
            None => eprintln!("{} Config updated", "✓".green()),
            Some(e) => eprintln!("{} {e}", "✗".red()),
        }
    }

    // stdin closed: let the last scheduled push go out
    while !scheduler.is_idle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    printer.abort();

    Ok(match scheduler.status() {
        AutoPushStatus::Failed(_) => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    })
}
